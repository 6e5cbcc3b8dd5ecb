//! Time-related abstractions.
//!
//! `sleep` and `timeout` integrate with Tokio's timer wheel; `Instant` is
//! monotonic and suitable for measuring elapsed time.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{sleep, timeout, Duration};
//!
//! async fn example() {
//!     let outcome = timeout(Duration::from_millis(100), async {
//!         sleep(Duration::from_millis(10)).await;
//!         "done"
//!     })
//!     .await;
//!     assert_eq!(outcome.ok(), Some("done"));
//! }
//! ```

pub use tokio::time::error::Elapsed;
pub use tokio::time::{sleep, sleep_until, timeout, Sleep, Timeout};

pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
