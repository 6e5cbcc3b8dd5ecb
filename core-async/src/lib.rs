//! Async runtime abstraction layer for the melody catalog core.
//!
//! All `core-*` and `bridge-*` crates depend on this crate instead of reaching
//! for Tokio directly, so the executor stays an implementation detail.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeout and clock types
//! - `sync`: Async-aware synchronization primitives and channels
//! - `io`: Async read/write traits
//! - `runtime`: [`runtime::BackgroundRuntime`], the persistent background
//!   execution context that owns every network call
//!
//! # Examples
//!
//! ```rust
//! use core_async::runtime::BackgroundRuntime;
//! use core_async::time::{sleep, Duration};
//!
//! let runtime = BackgroundRuntime::start("worker").unwrap();
//! let handle = runtime.spawn(async {
//!     sleep(Duration::from_millis(5)).await;
//!     42
//! });
//! # drop(handle);
//! assert!(runtime.shutdown(Duration::from_secs(1)));
//! ```

pub mod io;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
