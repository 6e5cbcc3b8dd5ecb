//! Task bridge between a presentation thread and the background runtime.
//!
//! The presentation thread owns the [`TaskBridge`]. It submits [`Operation`]s,
//! which run on a dedicated background thread, and periodically drains
//! finished results with [`TaskBridge::dispatch_pending`] (or blocks briefly
//! with [`TaskBridge::wait_and_dispatch`]). Handlers therefore always run on
//! the thread that owns the bridge and never need to be `Send`.
//!
//! Every submission is delivered exactly once: to the one-shot callback given
//! to [`TaskBridge::submit_with`] if there is one, otherwise to the handler
//! registered for its result kind. An operation that panics is delivered as a
//! failure. Completion order follows network latency, not submission order;
//! see [`crate::LiveRequest`].
//!
//! ```ignore
//! let mut bridge = service.start_bridge()?;
//! bridge.on_search_done(|request_id, outcome| render(request_id, outcome));
//! bridge.submit(Operation::search("sunny day"))?;
//!
//! // in the UI loop
//! bridge.dispatch_pending();
//! ```

use crate::error::{CoreError, Result};
use crate::operation::{DownloadInfo, Operation, RequestId, TaskResult};
use crate::CoreService;
use core_async::runtime::BackgroundRuntime;
use core_catalog::{
    CatalogError, CatalogOutcome, CoverImage, DownloadError, DownloadProgress, DownloadReport,
    TrackDetail, TrackSummary,
};
use core_runtime::events::{CoreEvent, TaskEvent};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const WORKER_THREAD_NAME: &str = "melodyfetch-worker";

type Handler<T> = Option<Box<dyn FnMut(RequestId, T)>>;
type Callback = Box<dyn FnOnce(RequestId, TaskResult)>;

enum Message {
    Progress {
        request_id: RequestId,
        progress: DownloadProgress,
    },
    Completed {
        request_id: RequestId,
        operation: &'static str,
        result: TaskResult,
    },
}

#[derive(Default)]
struct Handlers {
    search_done: Handler<CatalogOutcome<Vec<TrackSummary>>>,
    detail_done: Handler<CatalogOutcome<TrackDetail>>,
    download_info: Handler<DownloadInfo>,
    cover_ready: Handler<std::result::Result<CoverImage, CatalogError>>,
    download_progress: Handler<DownloadProgress>,
    download_finished: Handler<std::result::Result<DownloadReport, DownloadError>>,
}

/// Returned by [`TaskBridge::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionHandle {
    request_id: RequestId,
    operation: &'static str,
}

impl SubmissionHandle {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }
}

pub struct TaskBridge {
    service: CoreService,
    runtime: Option<BackgroundRuntime>,
    sender: mpsc::Sender<Message>,
    receiver: mpsc::Receiver<Message>,
    next_id: u64,
    callbacks: HashMap<RequestId, Callback>,
    handlers: Handlers,
    active_download: Option<RequestId>,
}

impl TaskBridge {
    /// Starts the background runtime.
    pub fn start(service: CoreService) -> Result<Self> {
        let runtime = BackgroundRuntime::start(WORKER_THREAD_NAME)?;
        let (sender, receiver) = mpsc::channel();
        info!(thread = WORKER_THREAD_NAME, "Task bridge started");

        Ok(Self {
            service,
            runtime: Some(runtime),
            sender,
            receiver,
            next_id: 0,
            callbacks: HashMap::new(),
            handlers: Handlers::default(),
            active_download: None,
        })
    }

    pub fn on_search_done<F>(&mut self, handler: F)
    where
        F: FnMut(RequestId, CatalogOutcome<Vec<TrackSummary>>) + 'static,
    {
        self.handlers.search_done = Some(Box::new(handler));
    }

    pub fn on_detail_done<F>(&mut self, handler: F)
    where
        F: FnMut(RequestId, CatalogOutcome<TrackDetail>) + 'static,
    {
        self.handlers.detail_done = Some(Box::new(handler));
    }

    pub fn on_download_info<F>(&mut self, handler: F)
    where
        F: FnMut(RequestId, DownloadInfo) + 'static,
    {
        self.handlers.download_info = Some(Box::new(handler));
    }

    pub fn on_cover_ready<F>(&mut self, handler: F)
    where
        F: FnMut(RequestId, std::result::Result<CoverImage, CatalogError>) + 'static,
    {
        self.handlers.cover_ready = Some(Box::new(handler));
    }

    pub fn on_download_progress<F>(&mut self, handler: F)
    where
        F: FnMut(RequestId, DownloadProgress) + 'static,
    {
        self.handlers.download_progress = Some(Box::new(handler));
    }

    pub fn on_download_finished<F>(&mut self, handler: F)
    where
        F: FnMut(RequestId, std::result::Result<DownloadReport, DownloadError>) + 'static,
    {
        self.handlers.download_finished = Some(Box::new(handler));
    }

    /// Queues `operation` and returns immediately. The result goes to the
    /// handler registered for its kind.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ShutDown`] after [`TaskBridge::shutdown`]
    /// - [`CoreError::DownloadInProgress`] for a second concurrent download
    pub fn submit(&mut self, operation: Operation) -> Result<SubmissionHandle> {
        self.spawn(operation)
    }

    /// Like [`TaskBridge::submit`], but the result goes to `callback` instead
    /// of the named handler.
    pub fn submit_with<F>(&mut self, operation: Operation, callback: F) -> Result<SubmissionHandle>
    where
        F: FnOnce(RequestId, TaskResult) + 'static,
    {
        let handle = self.spawn(operation)?;
        self.callbacks.insert(handle.request_id, Box::new(callback));
        Ok(handle)
    }

    /// Delivers every finished result without blocking. Returns the number of
    /// submissions delivered.
    /// Nothing is delivered once the bridge has shut down.
    pub fn dispatch_pending(&mut self) -> usize {
        if self.runtime.is_none() {
            self.discard_pending();
            return 0;
        }

        let mut delivered = 0;
        while let Ok(message) = self.receiver.try_recv() {
            delivered += self.handle_message(message);
        }
        delivered
    }

    /// Waits up to `timeout` for at least one message, then behaves like
    /// [`TaskBridge::dispatch_pending`].
    pub fn wait_and_dispatch(&mut self, timeout: Duration) -> usize {
        if self.runtime.is_none() {
            self.discard_pending();
            return 0;
        }

        match self.receiver.recv_timeout(timeout) {
            Ok(message) => self.handle_message(message) + self.dispatch_pending(),
            Err(_) => 0,
        }
    }

    /// Submissions whose results have not been delivered yet.
    pub fn pending_callbacks(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_download_active(&self) -> bool {
        self.active_download.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.runtime.as_ref().map_or(false, BackgroundRuntime::is_running)
    }

    /// Stops the background runtime, waiting at most the configured grace
    /// period. In-flight operations are abandoned, and results already queued
    /// are discarded without reaching any callback or handler.
    ///
    /// Returns `true` if the worker thread exited in time.
    pub fn shutdown(&mut self) -> bool {
        let Some(runtime) = self.runtime.take() else {
            return true;
        };

        let grace = self.service.config().shutdown_grace;
        let abandoned = self.callbacks.len();
        let joined = runtime.shutdown(grace);
        self.callbacks.clear();
        self.active_download = None;
        let discarded = self.discard_pending();

        if joined {
            info!(abandoned, discarded, "Task bridge shut down");
        } else {
            warn!(abandoned, discarded, grace_ms = grace.as_millis() as u64, "Worker did not stop within grace period");
        }
        joined
    }

    fn spawn(&mut self, operation: Operation) -> Result<SubmissionHandle> {
        if !self.is_running() {
            return Err(CoreError::ShutDown);
        }

        if operation.is_download() {
            if let Some(active) = self.active_download {
                debug!(active = %active, "Rejecting concurrent download");
                return Err(CoreError::DownloadInProgress);
            }
        }

        self.next_id += 1;
        let request_id = RequestId::new(self.next_id);
        let name = operation.name();
        if operation.is_download() {
            self.active_download = Some(request_id);
        }

        debug!(request_id = request_id.value(), operation = name, "Submitting task");
        self.service.emit(CoreEvent::Task(TaskEvent::Submitted {
            request_id: request_id.value(),
            operation: name.to_string(),
        }));

        let Some(runtime) = self.runtime.as_ref() else {
            return Err(CoreError::ShutDown);
        };
        let service = self.service.clone();
        let sender = self.sender.clone();
        runtime.spawn(async move {
            let fallback = operation.clone();
            let work = run_operation(service.clone(), request_id, operation, sender.clone());

            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(request_id = request_id.value(), operation = name, panic = %message, "Task panicked");
                    fallback.failure(format!("Task panicked: {}", message))
                }
            };

            service.emit(CoreEvent::Task(TaskEvent::Completed {
                request_id: request_id.value(),
                operation: name.to_string(),
                outcome: result.outcome_kind().to_string(),
            }));

            // The receiver is gone once the bridge is dropped.
            sender
                .send(Message::Completed {
                    request_id,
                    operation: name,
                    result,
                })
                .ok();
        });

        Ok(SubmissionHandle {
            request_id,
            operation: name,
        })
    }

    /// Empties the channel without running any handler.
    fn discard_pending(&mut self) -> usize {
        let mut discarded = 0;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    fn handle_message(&mut self, message: Message) -> usize {
        match message {
            Message::Progress {
                request_id,
                progress,
            } => {
                if let Some(handler) = self.handlers.download_progress.as_mut() {
                    handler(request_id, progress);
                }
                0
            }
            Message::Completed {
                request_id,
                operation,
                result,
            } => {
                self.deliver(request_id, operation, result);
                1
            }
        }
    }

    fn deliver(&mut self, request_id: RequestId, operation: &'static str, result: TaskResult) {
        if self.active_download == Some(request_id) {
            self.active_download = None;
        }

        debug!(
            request_id = request_id.value(),
            operation,
            outcome = result.outcome_kind(),
            "Delivering result"
        );

        if let Some(callback) = self.callbacks.remove(&request_id) {
            callback(request_id, result);
            return;
        }

        let handled = match result {
            TaskResult::Search(outcome) => call(&mut self.handlers.search_done, request_id, outcome),
            TaskResult::Detail(outcome) => call(&mut self.handlers.detail_done, request_id, outcome),
            TaskResult::DownloadInfo(info) => {
                call(&mut self.handlers.download_info, request_id, info)
            }
            TaskResult::Cover(result) => call(&mut self.handlers.cover_ready, request_id, result),
            TaskResult::Download(result) => {
                call(&mut self.handlers.download_finished, request_id, result)
            }
        };

        if !handled {
            warn!(request_id = request_id.value(), operation, "No handler registered, result dropped");
        }
    }
}

impl Drop for TaskBridge {
    fn drop(&mut self) {
        if self.runtime.is_some() {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for TaskBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBridge")
            .field("running", &self.is_running())
            .field("next_id", &self.next_id)
            .field("pending_callbacks", &self.callbacks.len())
            .field("active_download", &self.active_download)
            .finish()
    }
}

fn call<T>(handler: &mut Handler<T>, request_id: RequestId, value: T) -> bool {
    match handler.as_mut() {
        Some(handler) => {
            handler(request_id, value);
            true
        }
        None => false,
    }
}

async fn run_operation(
    service: CoreService,
    request_id: RequestId,
    operation: Operation,
    sender: mpsc::Sender<Message>,
) -> TaskResult {
    match operation {
        Operation::Search { keyword } => TaskResult::Search(service.search(&keyword).await),
        Operation::FetchById { id } => TaskResult::Detail(service.fetch_by_id(&id).await),
        Operation::FetchForDownload {
            id,
            display_name,
            artist_name,
        } => TaskResult::DownloadInfo(DownloadInfo {
            outcome: service.fetch_by_id(&id).await,
            display_name,
            artist_name,
        }),
        Operation::FetchCover { url } => TaskResult::Cover(service.fetch_cover(&url).await),
        Operation::Download { url, destination } => {
            let report = service
                .download(&url, &destination, move |progress| {
                    sender
                        .send(Message::Progress {
                            request_id,
                            progress,
                        })
                        .ok();
                })
                .await;
            TaskResult::Download(report)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
