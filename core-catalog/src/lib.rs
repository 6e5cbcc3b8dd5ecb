//! # Remote Catalog Module
//!
//! Client for the remote music catalog: keyword search, track detail lookup,
//! cover art and audio downloads.
//!
//! ## Overview
//!
//! - [`CatalogClient`] wraps the search and detail endpoints in explicit
//!   [`RetryPolicy`] loops and reports a tagged [`CatalogOutcome`]
//! - [`CoverArtFetcher`] downloads cover art and scales it to a fixed box
//! - [`Downloader`] streams an audio file to disk with progress reporting
//!
//! All network access goes through the `HttpClient` bridge, so every
//! component can be exercised against a mock.

pub mod client;
pub mod cover;
pub mod download;
pub mod error;
pub mod models;
pub mod retry;
mod wire;

#[cfg(test)]
mod test_support;

pub use client::CatalogClient;
pub use cover::{CoverArtFetcher, CoverImage};
pub use download::{DownloadProgress, DownloadReport, Downloader};
pub use error::{CatalogError, DownloadError, Result};
pub use models::{suggested_file_name, CatalogQuery, TrackDetail, TrackSummary, UNKNOWN_LABEL};
pub use retry::{Backoff, CatalogOutcome, RetryPolicy};
