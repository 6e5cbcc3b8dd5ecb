//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (rustls, pooled keep-alive connections)
//! - `FileSystemAccess` using `tokio::fs`, defaulting to the user's download folder
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
//!
//! let http_client = ReqwestHttpClient::new()?;
//! let fs = TokioFileSystem::new();
//! ```

mod filesystem;
mod http;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
