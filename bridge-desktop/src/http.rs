//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{DownloadStream, HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use futures_util::TryStreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_USER_AGENT: &str = concat!("melodyfetch-core/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling and keep-alive via reqwest
/// - rustls TLS
/// - Streamed bodies for downloads
///
/// Each call is a single attempt; retry policy lives with the caller.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(4)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Create a new HTTP client from a preconfigured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn build_request(&self, request: &HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in &request.headers {
            req = req.header(key, value);
        }

        req
    }

    fn collect_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect()
    }

    /// Timeouts and connection-level faults keep their own variants so the
    /// caller can decide whether to retry.
    fn map_error(url: &str, e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Timeout(format!("{}: {}", url, e))
        } else if e.is_connect() || e.is_request() || e.is_body() {
            BridgeError::Transport(format!("{}: {}", url, e))
        } else {
            BridgeError::OperationFailed(format!("{}: {}", url, e))
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(url = %request.url, timeout = ?request.timeout, "Executing HTTP request");

        let mut builder = self.build_request(&request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&request.url, e))?;

        let status = response.status().as_u16();
        let headers = Self::collect_headers(&response);
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&request.url, e))?;

        debug!(url = %request.url, status, size = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn download_stream(&self, request: HttpRequest) -> Result<DownloadStream> {
        debug!(url = %request.url, "Opening download stream");

        let send = self.build_request(&request).send();
        let response = match request.timeout {
            Some(timeout) => core_async::time::timeout(timeout, send)
                .await
                .map_err(|_| {
                    BridgeError::Timeout(format!(
                        "{}: no response within {:?}",
                        request.url, timeout
                    ))
                })?,
            None => send.await,
        }
        .map_err(|e| Self::map_error(&request.url, e))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let reader = tokio_util::io::StreamReader::new(stream);

        Ok(DownloadStream {
            status,
            content_length,
            reader: Box::new(reader),
        })
    }
}
