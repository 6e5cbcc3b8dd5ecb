//! Runtime utilities that abstract over the underlying async executor.
//!
//! [`BackgroundRuntime`] is a persistent execution context living on its own OS
//! thread. Callers that must never block (a presentation thread, for example)
//! hand work to it with [`BackgroundRuntime::spawn`] and later receive results
//! through a channel of their choice.
//!
//! The runtime is single-threaded: any number of suspended network calls are
//! multiplexed on the one background thread.

use std::future::Future;
use std::io;
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

pub use tokio::runtime::{Builder, Handle, Runtime};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A Tokio current-thread runtime driven by a dedicated named thread.
///
/// Dropping the runtime requests a stop without waiting for it. Use
/// [`BackgroundRuntime::shutdown`] for a bounded join.
pub struct BackgroundRuntime {
    name: String,
    handle: Handle,
    stop_tx: Option<oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl BackgroundRuntime {
    /// Builds the runtime and starts its driver thread.
    pub fn start(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let runtime = Builder::new_current_thread()
            .enable_all()
            .thread_name(name.clone())
            .build()?;
        let handle = runtime.handle().clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            runtime.block_on(async {
                // A dropped sender counts as a stop request too.
                let _ = stop_rx.await;
            });
            // Tasks still pending at this point are abandoned, not awaited.
            runtime.shutdown_background();
        })?;

        Ok(Self {
            name,
            handle,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Name given to the driver thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle to the underlying runtime.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns `true` while the driver thread is alive and no stop was requested.
    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
            && self
                .thread
                .as_ref()
                .map(|thread| !thread.is_finished())
                .unwrap_or(false)
    }

    /// Spawns a future onto the background context.
    ///
    /// Returns immediately. After shutdown the returned handle resolves to a
    /// cancelled [`crate::task::JoinError`].
    pub fn spawn<F>(&self, future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Requests a cooperative stop and waits at most `grace` for the driver
    /// thread to exit.
    ///
    /// Returns `true` when the thread was joined inside the grace period. On
    /// `false` the thread is detached and finishes on its own.
    pub fn shutdown(mut self, grace: Duration) -> bool {
        self.request_stop();

        let Some(thread) = self.thread.take() else {
            return true;
        };

        let deadline = Instant::now() + grace;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }

        thread.join().is_ok()
    }

    fn request_stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

impl Drop for BackgroundRuntime {
    fn drop(&mut self) {
        self.request_stop();
    }
}

impl std::fmt::Debug for BackgroundRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundRuntime")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}
