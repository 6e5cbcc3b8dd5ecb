//! Retry policies and operation outcomes.

use crate::error::{CatalogError, Result};
use core_runtime::config::CatalogApiConfig;
use rand::Rng;
use std::time::Duration;

/// Delay between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Uniformly drawn from `min..=max` at millisecond resolution.
    Jittered { min: Duration, max: Duration },
}

impl Backoff {
    pub fn next_delay(&self) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Jittered { min, max } => {
                let min_ms = min.as_millis() as u64;
                let max_ms = max.as_millis() as u64;
                if max_ms <= min_ms {
                    return min;
                }
                Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Three attempts with a random 1 to 5 second pause in between.
    pub fn search() -> Self {
        Self::new(
            3,
            Backoff::Jittered {
                min: Duration::from_secs(1),
                max: Duration::from_secs(5),
            },
        )
    }

    /// The first attempt plus three retries, one second apart.
    pub fn detail() -> Self {
        Self::new(4, Backoff::Fixed(Duration::from_secs(1)))
    }

    pub fn search_from(config: &CatalogApiConfig) -> Self {
        Self::new(
            config.search_max_attempts,
            Backoff::Jittered {
                min: Duration::from_secs(config.search_backoff_min_secs),
                max: Duration::from_secs(config.search_backoff_max_secs),
            },
        )
    }

    pub fn detail_from(config: &CatalogApiConfig) -> Self {
        Self::new(
            config.detail_max_retries.saturating_add(1),
            Backoff::Fixed(Duration::from_millis(config.detail_backoff_ms)),
        )
    }

    pub fn next_delay(&self) -> Duration {
        self.backoff.next_delay()
    }
}

/// Attempt bookkeeping for one retrying operation.
#[derive(Debug)]
pub(crate) struct RetryState {
    attempt: u32,
    max_attempts: u32,
    last_error: Option<CatalogError>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts.max(1),
            last_error: None,
        }
    }

    /// Starts the next attempt and returns its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    pub fn record_failure(&mut self, error: CatalogError) {
        self.last_error = Some(error);
    }

    pub fn has_remaining(&self) -> bool {
        self.attempt < self.max_attempts
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn last_error(&self) -> Option<&CatalogError> {
        self.last_error.as_ref()
    }

    pub fn into_last_error(self) -> CatalogError {
        self.last_error.unwrap_or_else(|| {
            CatalogError::Internal("Retry loop ended without an attempt".to_string())
        })
    }
}

/// Result of a catalog operation as delivered to the caller.
///
/// `Empty` means the service was asked and had nothing to offer, or every
/// search attempt came back without results.
#[derive(Debug)]
pub enum CatalogOutcome<T> {
    Success(T),
    Empty,
    Failure(CatalogError),
}

impl<T> CatalogOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CatalogOutcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            CatalogOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> CatalogOutcome<U> {
        match self {
            CatalogOutcome::Success(value) => CatalogOutcome::Success(f(value)),
            CatalogOutcome::Empty => CatalogOutcome::Empty,
            CatalogOutcome::Failure(error) => CatalogOutcome::Failure(error),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CatalogOutcome::Success(_) => "success",
            CatalogOutcome::Empty => "empty",
            CatalogOutcome::Failure(_) => "failure",
        }
    }

    /// Collapses `Empty` into `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            CatalogOutcome::Success(value) => Ok(Some(value)),
            CatalogOutcome::Empty => Ok(None),
            CatalogOutcome::Failure(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jittered_delay_stays_in_bounds() {
        let policy = RetryPolicy::search();
        for _ in 0..200 {
            let delay = policy.next_delay();
            assert!(delay >= Duration::from_secs(1), "{delay:?}");
            assert!(delay <= Duration::from_secs(5), "{delay:?}");
        }
    }

    #[test]
    fn test_degenerate_jitter_range() {
        let backoff = Backoff::Jittered {
            min: Duration::from_secs(2),
            max: Duration::from_secs(2),
        };
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_policies_from_config() {
        let config = CatalogApiConfig::default();
        assert_eq!(RetryPolicy::search_from(&config), RetryPolicy::search());
        assert_eq!(RetryPolicy::detail_from(&config), RetryPolicy::detail());
        assert_eq!(RetryPolicy::new(0, Backoff::Fixed(Duration::ZERO)).max_attempts, 1);
    }

    #[test]
    fn test_retry_state_counts_attempts() {
        let mut state = RetryState::new(&RetryPolicy::detail());
        loop {
            state.begin_attempt();
            state.record_failure(CatalogError::ServiceBusy);
            if !state.has_remaining() {
                break;
            }
        }
        assert_eq!(state.attempts(), 4);
        assert!(matches!(state.into_last_error(), CatalogError::ServiceBusy));
    }

    #[test]
    fn test_outcome_helpers() {
        let outcome: CatalogOutcome<u32> = CatalogOutcome::Success(2);
        assert_eq!(outcome.kind(), "success");
        assert_eq!(outcome.map(|n| n * 2).success(), Some(4));

        let empty: CatalogOutcome<u32> = CatalogOutcome::Empty;
        assert_eq!(empty.kind(), "empty");
        assert!(matches!(empty.into_result(), Ok(None)));

        let failed: CatalogOutcome<u32> = CatalogOutcome::Failure(CatalogError::MissingData);
        assert!(!failed.is_success());
        assert!(failed.into_result().is_err());
    }
}
