//! # Event Bus System
//!
//! Status notifications for the catalog core, broadcast over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event Types**: [`CoreEvent`] wraps one enum per domain (tasks, catalog
//!   retries, downloads)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! Events are observational. Results of submitted work are delivered by the
//! task bridge, never through this bus, so a lagging or absent subscriber
//! cannot lose a result.
//!
//! ```text
//! ┌───────────────┐    emit     ┌───────────┐   subscribe   ┌────────────┐
//! │ CatalogClient ├────────────>│           ├──────────────>│ Status bar │
//! └───────────────┘             │ EventBus  │               └────────────┘
//! ┌───────────────┐    emit     │           │   subscribe   ┌────────────┐
//! │  TaskBridge   ├────────────>│           ├──────────────>│ Log viewer │
//! └───────────────┘             └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Catalog(CatalogEvent::RetryScheduled {
//!     operation: "search".to_string(),
//!     attempt: 1,
//!     max_attempts: 3,
//!     delay_ms: 2000,
//!     reason: "empty result".to_string(),
//! }))
//! .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Catalog retry scheduled");
//! # }
//! ```

use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use core_async::sync::broadcast::error::{RecvError, SendError};
pub use core_async::sync::broadcast::Receiver;

/// Default capacity of the event buffer.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Task(TaskEvent),
    Catalog(CatalogEvent),
    Download(DownloadEvent),
}

impl CoreEvent {
    /// Short human-readable description.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Task(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
            CoreEvent::Download(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Catalog(CatalogEvent::AttemptsExhausted { .. }) => EventSeverity::Warning,
            CoreEvent::Catalog(CatalogEvent::Rejected { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Download(DownloadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Task(TaskEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Lifecycle of work handed to the task bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TaskEvent {
    Submitted {
        request_id: u64,
        operation: String,
    },
    /// `outcome` is one of `success`, `empty` or `failure`.
    Completed {
        request_id: u64,
        operation: String,
        outcome: String,
    },
}

impl TaskEvent {
    fn description(&self) -> &str {
        match self {
            TaskEvent::Submitted { .. } => "Task submitted",
            TaskEvent::Completed { .. } => "Task completed",
        }
    }
}

/// Retry activity inside the catalog client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    RetryScheduled {
        operation: String,
        attempt: u32,
        max_attempts: u32,
        delay_ms: u64,
        reason: String,
    },
    AttemptsExhausted {
        operation: String,
        attempts: u32,
        reason: String,
    },
    /// The service answered with an error that is not worth retrying.
    Rejected {
        operation: String,
        reason: String,
    },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::RetryScheduled { .. } => "Catalog retry scheduled",
            CatalogEvent::AttemptsExhausted { .. } => "Catalog attempts exhausted",
            CatalogEvent::Rejected { .. } => "Catalog request rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    Started {
        file_name: String,
        total_bytes: Option<u64>,
    },
    /// Emitted when the whole-percent value changes.
    Progress {
        file_name: String,
        received_bytes: u64,
        total_bytes: Option<u64>,
        percent: Option<u8>,
    },
    Completed {
        file_name: String,
        bytes_written: u64,
    },
    Failed {
        file_name: String,
        message: String,
    },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Started { .. } => "Download started",
            DownloadEvent::Progress { .. } => "Download in progress",
            DownloadEvent::Completed { .. } => "Download completed",
            DownloadEvent::Failed { .. } => "Download failed",
        }
    }
}

/// Central broadcast channel. Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event.
    ///
    /// Returns the number of subscribers reached; errors when there are none,
    /// which callers usually ignore with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver wrapper that skips events rejected by a predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map(|f| f(event)).unwrap_or(true)
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive, suitable for polling from a synchronous thread.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
