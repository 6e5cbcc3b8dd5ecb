//! Audio file download with progress reporting.
//!
//! The body is streamed to `<destination>.part` and renamed into place once
//! every byte has arrived, so a failed transfer never leaves a truncated file
//! under the final name. Nothing here is retried.

use crate::error::DownloadError;
use bridge_traits::http::{DownloadStream, HttpClient, HttpRequest};
use bridge_traits::storage::FileSystemAccess;
use core_async::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 64 * 1024;
const PARTIAL_SUFFIX: &str = ".part";

/// Bytes received so far and, when the server announced it, the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub received: u64,
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Whole percent complete, if the total size is known.
    pub fn percent(&self) -> Option<u8> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.received.saturating_mul(100) / total).min(100) as u8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadReport {
    pub path: PathBuf,
    pub bytes_written: u64,
}

pub struct Downloader {
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    timeout: Duration,
    events: Option<EventBus>,
}

impl Downloader {
    /// `timeout` bounds the wait for response headers, not the transfer.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            file_system,
            timeout,
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Downloads `url` to `destination`, creating parent directories.
    ///
    /// `on_progress` is called whenever the whole-percent value changes, or
    /// for every chunk when the total size is unknown.
    pub async fn download<F>(
        &self,
        url: &str,
        destination: &Path,
        mut on_progress: F,
    ) -> Result<DownloadReport, DownloadError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let file_name = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let result = self
            .transfer(url, destination, &file_name, &mut on_progress)
            .await;

        match &result {
            Ok(report) => {
                info!(file = %file_name, bytes = report.bytes_written, "Download completed");
                self.emit(DownloadEvent::Completed {
                    file_name,
                    bytes_written: report.bytes_written,
                });
            }
            Err(error) => {
                warn!(file = %file_name, error = %error, "Download failed");
                self.emit(DownloadEvent::Failed {
                    file_name,
                    message: error.to_string(),
                });
            }
        }

        result
    }

    async fn transfer<F>(
        &self,
        url: &str,
        destination: &Path,
        file_name: &str,
        on_progress: &mut F,
    ) -> Result<DownloadReport, DownloadError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        if url.trim().is_empty() {
            return Err(DownloadError::MissingUrl);
        }

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.file_system
                .create_dir_all(parent)
                .await
                .map_err(DownloadError::FileSystem)?;
        }

        let request = HttpRequest::get(url).timeout(self.timeout);
        let stream = core_async::time::timeout(self.timeout, self.http_client.download_stream(request))
            .await
            .map_err(|_| {
                DownloadError::Network(format!(
                    "No response within {}s",
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        if !(200..300).contains(&stream.status) {
            return Err(DownloadError::Http {
                status: stream.status,
            });
        }

        self.emit(DownloadEvent::Started {
            file_name: file_name.to_string(),
            total_bytes: stream.content_length,
        });

        let partial = partial_path(destination);
        let mut writer = self
            .file_system
            .open_write_stream(&partial)
            .await
            .map_err(DownloadError::FileSystem)?;

        let copied = self
            .copy_body(stream, &mut writer, file_name, on_progress)
            .await;
        drop(writer);

        let bytes_written = match copied {
            Ok(bytes) => bytes,
            Err(error) => {
                self.remove_partial(&partial).await;
                return Err(error);
            }
        };

        if let Err(error) = self.file_system.rename(&partial, destination).await {
            self.remove_partial(&partial).await;
            return Err(DownloadError::FileSystem(error));
        }

        Ok(DownloadReport {
            path: destination.to_path_buf(),
            bytes_written,
        })
    }

    async fn copy_body<F>(
        &self,
        mut stream: DownloadStream,
        writer: &mut Box<dyn AsyncWrite + Send + Unpin>,
        file_name: &str,
        on_progress: &mut F,
    ) -> Result<u64, DownloadError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let total = stream.content_length;
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut progress = DownloadProgress { received: 0, total };
        let mut last_percent = None;

        on_progress(progress);

        loop {
            let read = stream
                .reader
                .read(&mut buffer)
                .await
                .map_err(|e| DownloadError::Network(format!("Read failed: {}", e)))?;
            if read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..read])
                .await
                .map_err(|e| DownloadError::FileSystem(e.into()))?;

            progress.received += read as u64;
            let percent = progress.percent();
            if total.is_none() || percent != last_percent {
                last_percent = percent;
                on_progress(progress);
                self.emit(DownloadEvent::Progress {
                    file_name: file_name.to_string(),
                    received_bytes: progress.received,
                    total_bytes: total,
                    percent,
                });
            }
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadError::FileSystem(e.into()))?;
        writer
            .shutdown()
            .await
            .map_err(|e| DownloadError::FileSystem(e.into()))?;

        if let Some(expected) = total {
            if progress.received < expected {
                return Err(DownloadError::Network(format!(
                    "Connection closed after {} of {} bytes",
                    progress.received, expected
                )));
            }
        }

        debug!(file = %file_name, bytes = progress.received, "Body fully received");
        Ok(progress.received)
    }

    async fn remove_partial(&self, partial: &Path) {
        if let Ok(true) = self.file_system.exists(partial).await {
            if let Err(error) = self.file_system.delete_file(partial).await {
                warn!(error = %error, "Failed to remove partial download");
            }
        }
    }

    fn emit(&self, event: DownloadEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Download(event)).ok();
        }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name: OsString = destination.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}
