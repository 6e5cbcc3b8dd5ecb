//! Core service façade and bootstrap helpers.
//!
//! [`CoreService`] wires a validated [`CoreConfig`] into the catalog client,
//! the cover fetcher and the downloader, and exposes them as async calls.
//! Hosts with a single UI thread start a [`TaskBridge`] from it and never
//! await anything themselves. Desktop apps typically enable the
//! `desktop-shims` feature and call [`bootstrap_desktop`].

pub mod bridge;
pub mod error;
pub mod operation;
pub mod staleness;

pub use bridge::{SubmissionHandle, TaskBridge};
pub use error::{CoreError, Result};
pub use operation::{DownloadInfo, Operation, RequestId, TaskResult};
pub use staleness::LiveRequest;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use core_catalog::{
    CatalogClient, CatalogError, CatalogOutcome, CoverArtFetcher, CoverImage, DownloadError,
    DownloadProgress, DownloadReport, Downloader, TrackDetail, TrackSummary,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream};
use tracing::debug;

struct ServiceInner {
    config: CoreConfig,
    catalog: CatalogClient,
    covers: CoverArtFetcher,
    downloader: Downloader,
    events: EventBus,
}

/// Primary façade exposed to host applications. Cloning shares the same
/// clients and event bus.
#[derive(Clone)]
pub struct CoreService {
    inner: Arc<ServiceInner>,
}

impl CoreService {
    /// Builds the service from a configuration, validating it first.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate().map_err(CoreError::from_config)?;

        let events = EventBus::new(config.event_buffer_size);
        let catalog = CatalogClient::new(config.http_client.clone(), config.catalog.clone())
            .with_sleeper(config.sleeper.clone())
            .with_event_bus(events.clone());
        let covers = CoverArtFetcher::new(
            config.http_client.clone(),
            config.catalog.cover_box_px,
            config.catalog.download_timeout(),
        );
        let downloader = Downloader::new(
            config.http_client.clone(),
            config.file_system.clone(),
            config.catalog.download_timeout(),
        )
        .with_event_bus(events.clone());

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                catalog,
                covers,
                downloader,
                events,
            }),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.inner.config
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.inner.catalog
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub async fn search(&self, keyword: &str) -> CatalogOutcome<Vec<TrackSummary>> {
        self.inner.catalog.search(keyword).await
    }

    pub async fn fetch_by_id(&self, id: &str) -> CatalogOutcome<TrackDetail> {
        self.inner.catalog.fetch_by_id(id).await
    }

    pub async fn fetch_cover(&self, url: &str) -> std::result::Result<CoverImage, CatalogError> {
        self.inner.covers.fetch(url).await
    }

    /// Downloads `url`. A relative `destination` lands in the download
    /// directory.
    pub async fn download<F>(
        &self,
        url: &str,
        destination: &Path,
        on_progress: F,
    ) -> std::result::Result<DownloadReport, DownloadError>
    where
        F: FnMut(DownloadProgress) + Send,
    {
        let destination = self.resolve_destination(destination).await?;
        self.inner
            .downloader
            .download(url, &destination, on_progress)
            .await
    }

    /// Absolute path a download to `destination` would be written to.
    pub async fn resolve_destination(
        &self,
        destination: &Path,
    ) -> std::result::Result<PathBuf, DownloadError> {
        if destination.is_absolute() {
            return Ok(destination.to_path_buf());
        }

        let base = match &self.inner.config.download_dir {
            Some(dir) => dir.clone(),
            None => self
                .inner
                .config
                .file_system
                .get_download_directory()
                .await
                .map_err(DownloadError::FileSystem)?,
        };
        let resolved = base.join(destination);
        debug!(path = %core_runtime::logging::strip_path(&resolved.to_string_lossy()), "Resolved download destination");
        Ok(resolved)
    }

    /// Starts a [`TaskBridge`] owned by the calling thread.
    pub fn start_bridge(&self) -> Result<TaskBridge> {
        TaskBridge::start(self.clone())
    }

    pub(crate) fn emit(&self, event: CoreEvent) {
        self.inner.events.emit(event).ok();
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("catalog", &self.inner.catalog)
            .field("subscribers", &self.inner.events.subscriber_count())
            .finish()
    }
}

/// Builds a [`CoreService`] from an explicit configuration.
pub fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    CoreService::new(config)
}

/// Convenience bootstrapper for desktop hosts: default bridges, default
/// catalog settings, downloads into the user's download folder.
///
/// ```no_run
/// # fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop()?;
/// let mut bridge = core.start_bridge()?;
/// bridge.submit(core_service::Operation::search("sunny day"))?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop() -> Result<CoreService> {
    let config = CoreConfig::builder()
        .build()
        .map_err(CoreError::from_config)?;
    CoreService::new(config)
}
