//! Time and Logging Abstractions
//!
//! Injectable sleep primitive for retry backoff, plus the log level shared by
//! the logging configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sleep primitive used between retry attempts.
///
/// Tests inject a recording implementation so backoff can be asserted without
/// waiting in real time.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::Sleeper;
///
/// async fn back_off(sleeper: &dyn Sleeper) {
///     sleeper.sleep(Duration::from_secs(1)).await;
/// }
/// ```
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the async runtime's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSleeper;

#[async_trait]
impl Sleeper for SystemSleeper {
    async fn sleep(&self, duration: Duration) {
        core_async::time::sleep(duration).await;
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_system_sleeper_waits() {
        let start = Instant::now();
        SystemSleeper.sleep(Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Info.as_str(), "info");
    }
}
