//! # Host Bridge Traits
//!
//! Capability traits the catalog core needs from its host.
//!
//! ## Overview
//!
//! The core never talks to the network, the disk or the clock directly. Each of
//! those concerns is a trait here, implemented per host in a bridge crate:
//!
//! | Trait | Purpose | Desktop implementation |
//! |-------|---------|------------------------|
//! | [`HttpClient`](http::HttpClient) | Single-attempt GET with timeout and headers, streamed downloads | `bridge_desktop::ReqwestHttpClient` |
//! | [`FileSystemAccess`](storage::FileSystemAccess) | Writing downloaded audio to disk | `bridge_desktop::TokioFileSystem` |
//! | [`Sleeper`](time::Sleeper) | Backoff delays between retry attempts | [`SystemSleeper`](time::SystemSleeper) |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = config.http_client.ok_or_else(|| Error::CapabilityMissing {
//!     capability: "HttpClient".to_string(),
//!     message: "No HTTP client implementation provided. \
//!               Enable the `desktop-shims` feature or inject an adapter."
//!         .to_string(),
//! })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors so that timeouts and transport faults stay
//! distinguishable from everything else, since the catalog client retries on
//! exactly those.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; they are shared between tasks on
//! the background runtime.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{DownloadStream, HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use storage::FileSystemAccess;
pub use time::{LogLevel, Sleeper, SystemSleeper};
