//! # Core Configuration Module
//!
//! Configuration for the melody catalog core.
//!
//! ## Overview
//!
//! [`CoreConfig`] is assembled with [`CoreConfigBuilder`] and holds every bridge
//! the core needs plus the [`CatalogApiConfig`] describing the remote catalog.
//! The builder validates eagerly so a misconfigured host fails at startup
//! rather than on the first search.
//!
//! ## Dependencies (with platform defaults)
//!
//! - `HttpClient` - catalog, cover and download requests (desktop default: reqwest)
//! - `FileSystemAccess` - writing downloads (desktop default: tokio fs)
//! - `Sleeper` - retry backoff (default: runtime timer)
//!
//! When the `desktop-shims` feature is enabled, desktop defaults for
//! `HttpClient` and `FileSystemAccess` are injected if not provided. Without it
//! the builder returns [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CatalogApiConfig, CoreConfig};
//!
//! let catalog = CatalogApiConfig::load("melodyfetch.toml")?;
//! let config = CoreConfig::builder()
//!     .catalog(catalog)
//!     .download_dir("/home/jo/Music")
//!     .build()?;
//! ```
//!
//! ## Catalog file format
//!
//! Every key is optional; omitted keys keep their defaults.
//!
//! ```toml
//! base_url = "https://api.vkeys.cn/v2/music/netease"
//! search_timeout_secs = 10
//! detail_timeout_secs = 15
//! page_size = 10
//! search_max_attempts = 3
//! search_backoff_min_secs = 1
//! search_backoff_max_secs = 5
//! detail_max_retries = 3
//! detail_backoff_ms = 1000
//! distinguish_unreachable = false
//!
//! [headers]
//! Accept-Language = "en-US,en;q=0.9"
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FileSystemAccess, HttpClient, Sleeper, SystemSleeper};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default catalog endpoint serving both search and detail lookups.
pub const DEFAULT_CATALOG_BASE_URL: &str = "https://api.vkeys.cn/v2/music/netease";

/// Public song page, suffixed with the catalog id.
pub const DEFAULT_WEB_URL_BASE: &str = "https://music.163.com/song?id=";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                                  AppleWebKit/537.36 (KHTML, like Gecko) \
                                  Chrome/100.0.0.0 Safari/537.36";

const MAX_TIMEOUT_SECS: u64 = 300;
const MAX_PAGE_SIZE: u32 = 100;
const MAX_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Remote catalog settings.
///
/// Defaults reproduce the behavior the catalog service was tuned against:
/// 10 s search timeout with 3 jittered attempts, 15 s detail timeout with 3
/// fixed 1 s retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogApiConfig {
    pub base_url: String,
    pub web_url_base: String,
    pub search_timeout_secs: u64,
    pub detail_timeout_secs: u64,
    /// Bounds connection and headers of cover and audio downloads.
    pub download_timeout_secs: u64,
    pub page_size: u32,
    /// Total search attempts, including the first.
    pub search_max_attempts: u32,
    pub search_backoff_min_secs: u64,
    pub search_backoff_max_secs: u64,
    /// Detail retries after the first attempt.
    pub detail_max_retries: u32,
    pub detail_backoff_ms: u64,
    /// Browser-identifying header set sent with every catalog request.
    pub headers: BTreeMap<String, String>,
    /// Report a search that never reached the service as a failure instead
    /// of an empty result.
    pub distinguish_unreachable: bool,
    /// Edge of the square box cover art is scaled into.
    pub cover_box_px: u32,
}

impl Default for CatalogApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
            web_url_base: DEFAULT_WEB_URL_BASE.to_string(),
            search_timeout_secs: 10,
            detail_timeout_secs: 15,
            download_timeout_secs: 30,
            page_size: 10,
            search_max_attempts: 3,
            search_backoff_min_secs: 1,
            search_backoff_max_secs: 5,
            detail_max_retries: 3,
            detail_backoff_ms: 1000,
            headers: default_browser_headers(),
            distinguish_unreachable: false,
            cover_box_px: 150,
        }
    }
}

fn default_browser_headers() -> BTreeMap<String, String> {
    [
        ("User-Agent", DEFAULT_USER_AGENT),
        ("Accept", "application/json, text/plain, */*"),
        ("Accept-Language", "zh-CN,zh;q=0.9"),
        ("Connection", "keep-alive"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl CatalogApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_distinguish_unreachable(mut self, enabled: bool) -> Self {
        self.distinguish_unreachable = enabled;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| Error::Config(format!("Invalid catalog configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Cannot read catalog configuration {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Catalog base URL must be http(s): {}",
                self.base_url
            )));
        }

        for (name, secs) in [
            ("search_timeout_secs", self.search_timeout_secs),
            ("detail_timeout_secs", self.detail_timeout_secs),
            ("download_timeout_secs", self.download_timeout_secs),
        ] {
            if secs == 0 || secs > MAX_TIMEOUT_SECS {
                return Err(Error::Config(format!(
                    "{} must be between 1 and {} seconds",
                    name, MAX_TIMEOUT_SECS
                )));
            }
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.search_max_attempts == 0 {
            return Err(Error::Config(
                "Search needs at least one attempt".to_string(),
            ));
        }

        if self.search_backoff_min_secs > self.search_backoff_max_secs {
            return Err(Error::Config(
                "Search backoff minimum exceeds maximum".to_string(),
            ));
        }

        if self.cover_box_px == 0 {
            return Err(Error::Config(
                "Cover box size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,
    pub file_system: Arc<dyn FileSystemAccess>,
    pub sleeper: Arc<dyn Sleeper>,
    pub catalog: CatalogApiConfig,
    /// Where downloads go when the caller passes a bare file name. `None`
    /// defers to [`FileSystemAccess::get_download_directory`].
    pub download_dir: Option<PathBuf>,
    /// Bounded wait when joining the background runtime on shutdown.
    pub shutdown_grace: Duration,
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("sleeper", &"Sleeper { ... }")
            .field("catalog", &self.catalog)
            .field("download_dir", &self.download_dir)
            .field("shutdown_grace", &self.shutdown_grace)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.catalog.validate()?;

        if let Some(dir) = &self.download_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config(
                    "Download directory cannot be empty".to_string(),
                ));
            }
        }

        if self.shutdown_grace.is_zero() || self.shutdown_grace > MAX_SHUTDOWN_GRACE {
            return Err(Error::Config(format!(
                "Shutdown grace period must be between 1ms and {:?}",
                MAX_SHUTDOWN_GRACE
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::capability_missing(
        "HttpClient",
        "An HttpClient implementation is required for catalog requests. \
         Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
         Other hosts: inject a platform-native adapter.",
    )
}

#[cfg(not(feature = "desktop-shims"))]
fn file_system_missing_error() -> Error {
    Error::capability_missing(
        "FileSystemAccess",
        "A FileSystemAccess implementation is required to save downloads. \
         Desktop: enable the 'desktop-shims' feature to use TokioFileSystem. \
         Other hosts: inject a platform-native adapter.",
    )
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system(download_dir: Option<&Path>) -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs = match download_dir {
        Some(dir) => TokioFileSystem::with_download_directory(dir.to_path_buf()),
        None => TokioFileSystem::new(),
    };
    let fs: Arc<dyn FileSystemAccess> = Arc::new(fs);
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system(
    _download_dir: Option<&Path>,
) -> Result<Arc<dyn FileSystemAccess>> {
    Err(file_system_missing_error())
}

#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    catalog: Option<CatalogApiConfig>,
    download_dir: Option<PathBuf>,
    shutdown_grace: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn catalog(mut self, catalog: CatalogApiConfig) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn download_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.download_dir = Some(path.into());
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = Some(grace);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn build(self) -> Result<CoreConfig> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system(self.download_dir.as_deref())?,
        };

        let sleeper = self
            .sleeper
            .unwrap_or_else(|| Arc::new(SystemSleeper) as Arc<dyn Sleeper>);

        let config = CoreConfig {
            http_client,
            file_system,
            sleeper,
            catalog: self.catalog.unwrap_or_default(),
            download_dir: self.download_dir,
            shutdown_grace: self.shutdown_grace.unwrap_or(Duration::from_secs(1)),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
