//! Synchronization primitives.
//!
//! All primitives are async-aware `tokio::sync` types. They are `Send + Sync`
//! and never block the executor thread.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::Mutex;
//!
//! async fn example() {
//!     let mutex = Mutex::new(42);
//!     let mut guard = mutex.lock().await;
//!     *guard += 1;
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore,
};
