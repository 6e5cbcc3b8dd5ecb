//! Remote catalog client
//!
//! Two read operations against the catalog service, each wrapped in its own
//! retry loop:
//!
//! - **Search**: `GET {base}?word={keyword}&page=1&num={page_size}`
//! - **Detail**: `GET {base}?id={id}`
//!
//! The retry shapes differ on purpose. The search endpoint tends to fail by
//! answering with nothing, so any unsatisfying answer is retried after a
//! jittered pause and an exhausted search ends as [`CatalogOutcome::Empty`].
//! The detail endpoint signals overload with code `503`; that and transport
//! faults are retried on a fixed one second backoff while any other rejection
//! ends the call at once.
//!
//! ## Usage
//!
//! ```ignore
//! use core_catalog::{CatalogClient, CatalogOutcome};
//!
//! let client = CatalogClient::new(http_client, CatalogApiConfig::default());
//! match client.search("jay chou").await {
//!     CatalogOutcome::Success(tracks) => println!("{} tracks", tracks.len()),
//!     CatalogOutcome::Empty => println!("no results"),
//!     CatalogOutcome::Failure(e) => eprintln!("search failed: {e}"),
//! }
//! ```

use crate::error::{CatalogError, Result};
use crate::models::{TrackDetail, TrackSummary};
use crate::retry::{CatalogOutcome, RetryPolicy, RetryState};
use crate::wire::{Envelope, CODE_BUSY, CODE_OK};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::time::{Sleeper, SystemSleeper};
use core_runtime::config::CatalogApiConfig;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const HTTP_OK: u16 = 200;
const HTTP_SERVICE_UNAVAILABLE: u16 = 503;

const SEARCH_OPERATION: &str = "search";
const DETAIL_OPERATION: &str = "fetch_by_id";

#[derive(Clone)]
pub struct CatalogClient {
    http_client: Arc<dyn HttpClient>,
    sleeper: Arc<dyn Sleeper>,
    config: CatalogApiConfig,
    search_policy: RetryPolicy,
    detail_policy: RetryPolicy,
    events: Option<EventBus>,
}

impl CatalogClient {
    /// Creates a client whose retry policies follow `config`.
    pub fn new(http_client: Arc<dyn HttpClient>, config: CatalogApiConfig) -> Self {
        Self {
            http_client,
            sleeper: Arc::new(SystemSleeper),
            search_policy: RetryPolicy::search_from(&config),
            detail_policy: RetryPolicy::detail_from(&config),
            config,
            events: None,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Publishes retry activity as [`CatalogEvent`]s.
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_search_policy(mut self, policy: RetryPolicy) -> Self {
        self.search_policy = policy;
        self
    }

    pub fn with_detail_policy(mut self, policy: RetryPolicy) -> Self {
        self.detail_policy = policy;
        self
    }

    pub fn config(&self) -> &CatalogApiConfig {
        &self.config
    }

    /// Public song page for a catalog id.
    pub fn web_url(&self, id: &str) -> String {
        format!("{}{}", self.config.web_url_base, id)
    }

    /// Searches the catalog by keyword using the configured search policy.
    pub async fn search(&self, keyword: &str) -> CatalogOutcome<Vec<TrackSummary>> {
        let policy = self.search_policy;
        self.search_with_policy(keyword, &policy).await
    }

    /// Searches the catalog by keyword.
    ///
    /// # Returns
    ///
    /// - `Success` - the first page of results, never empty
    /// - `Empty` - every attempt came back without results
    /// - `Failure` - the keyword was blank, or attempts were exhausted while
    ///   `distinguish_unreachable` is enabled and the service was never
    ///   reached with a valid answer
    pub async fn search_with_policy(
        &self,
        keyword: &str,
        policy: &RetryPolicy,
    ) -> CatalogOutcome<Vec<TrackSummary>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return CatalogOutcome::Failure(CatalogError::InvalidInput(
                "Search keyword is empty".to_string(),
            ));
        }

        let mut state = RetryState::new(policy);
        loop {
            let attempt = state.begin_attempt();
            match self.search_once(keyword).await {
                Ok(tracks) => {
                    info!(attempt, results = tracks.len(), "Search succeeded");
                    return CatalogOutcome::Success(tracks);
                }
                Err(error) => {
                    warn!(
                        attempt,
                        max_attempts = state.max_attempts(),
                        error = %error,
                        "Search attempt failed"
                    );
                    state.record_failure(error);
                }
            }

            if !state.has_remaining() {
                break;
            }
            self.back_off(SEARCH_OPERATION, &state, policy).await;
        }

        self.report_exhausted(SEARCH_OPERATION, &state);

        let unreachable = !matches!(state.last_error(), Some(CatalogError::MissingData));
        if self.config.distinguish_unreachable && unreachable {
            CatalogOutcome::Failure(state.into_last_error())
        } else {
            CatalogOutcome::Empty
        }
    }

    /// Fetches full metadata for one track using the configured detail policy.
    pub async fn fetch_by_id(&self, id: &str) -> CatalogOutcome<TrackDetail> {
        let policy = self.detail_policy;
        self.fetch_by_id_with_policy(id, &policy).await
    }

    /// Fetches full metadata for one track. Never returns `Empty`.
    pub async fn fetch_by_id_with_policy(
        &self,
        id: &str,
        policy: &RetryPolicy,
    ) -> CatalogOutcome<TrackDetail> {
        let id = id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return CatalogOutcome::Failure(CatalogError::InvalidInput(format!(
                "Track id must be numeric: '{}'",
                id
            )));
        }

        let mut state = RetryState::new(policy);
        loop {
            let attempt = state.begin_attempt();
            match self.fetch_once(id).await {
                Ok(detail) => {
                    info!(attempt, id, "Track detail fetched");
                    return CatalogOutcome::Success(detail);
                }
                Err(error) if error.is_transient() => {
                    warn!(
                        attempt,
                        max_attempts = state.max_attempts(),
                        id,
                        error = %error,
                        "Detail attempt failed"
                    );
                    state.record_failure(error);
                }
                Err(error) => {
                    warn!(attempt, id, error = %error, "Detail request rejected");
                    self.emit(CatalogEvent::Rejected {
                        operation: DETAIL_OPERATION.to_string(),
                        reason: error.to_string(),
                    });
                    return CatalogOutcome::Failure(error);
                }
            }

            if !state.has_remaining() {
                break;
            }
            self.back_off(DETAIL_OPERATION, &state, policy).await;
        }

        self.report_exhausted(DETAIL_OPERATION, &state);
        CatalogOutcome::Failure(state.into_last_error())
    }

    async fn search_once(&self, keyword: &str) -> Result<Vec<TrackSummary>> {
        let url = format!(
            "{}?word={}&page=1&num={}",
            self.config.base_url,
            urlencoding::encode(keyword),
            self.config.page_size
        );

        let response = self.send(url, self.config.search_timeout()).await?;
        if response.status != HTTP_OK {
            return Err(CatalogError::Http {
                status: response.status,
            });
        }

        let envelope = Envelope::decode(&response.body)?;
        if envelope.code != Some(CODE_OK) {
            return Err(envelope.api_error());
        }

        let mut tracks = envelope.search_results();
        if tracks.is_empty() {
            return Err(CatalogError::MissingData);
        }
        tracks.truncate(self.config.page_size as usize);
        Ok(tracks)
    }

    async fn fetch_once(&self, id: &str) -> Result<TrackDetail> {
        let url = format!("{}?id={}", self.config.base_url, id);

        let response = self.send(url, self.config.detail_timeout()).await?;
        match response.status {
            HTTP_OK => {}
            HTTP_SERVICE_UNAVAILABLE => return Err(CatalogError::ServiceBusy),
            status => return Err(CatalogError::Http { status }),
        }

        let envelope = Envelope::decode(&response.body)?;
        match envelope.code {
            Some(CODE_OK) => envelope.detail(id),
            Some(CODE_BUSY) => Err(CatalogError::ServiceBusy),
            _ => Err(envelope.api_error()),
        }
    }

    /// One GET with the browser header set, bounded by `timeout` regardless of
    /// what the HTTP adapter enforces.
    async fn send(&self, url: String, timeout: Duration) -> Result<HttpResponse> {
        debug!(url = %url, "Catalog request");

        let request = HttpRequest::get(url)
            .headers(&self.config.headers)
            .timeout(timeout);

        match core_async::time::timeout(timeout, self.http_client.execute(request)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CatalogError::Timeout(format!(
                "No response within {}s",
                timeout.as_secs()
            ))),
        }
    }

    async fn back_off(&self, operation: &str, state: &RetryState, policy: &RetryPolicy) {
        let delay = policy.next_delay();
        debug!(
            operation,
            attempt = state.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Backing off before retry"
        );
        self.emit(CatalogEvent::RetryScheduled {
            operation: operation.to_string(),
            attempt: state.attempts(),
            max_attempts: state.max_attempts(),
            delay_ms: delay.as_millis() as u64,
            reason: state
                .last_error()
                .map(ToString::to_string)
                .unwrap_or_default(),
        });
        self.sleeper.sleep(delay).await;
    }

    fn report_exhausted(&self, operation: &str, state: &RetryState) {
        let reason = state
            .last_error()
            .map(ToString::to_string)
            .unwrap_or_default();
        warn!(
            operation,
            attempts = state.attempts(),
            reason = %reason,
            "Catalog attempts exhausted"
        );
        self.emit(CatalogEvent::AttemptsExhausted {
            operation: operation.to_string(),
            attempts: state.attempts(),
            reason,
        });
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(events) = &self.events {
            events.emit(CoreEvent::Catalog(event)).ok();
        }
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.config.base_url)
            .field("search_policy", &self.search_policy)
            .field("detail_policy", &self.detail_policy)
            .finish()
    }
}
