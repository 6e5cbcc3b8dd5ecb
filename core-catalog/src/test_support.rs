//! Shared fakes for unit tests.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::http::{DownloadStream, HttpClient, HttpRequest, HttpResponse};
use bridge_traits::time::Sleeper;
use bytes::Bytes;
use mockall::mock;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

mock! {
    pub HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        async fn download_stream(&self, request: HttpRequest) -> Result<DownloadStream>;
    }
}

/// Records requested delays instead of waiting.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub fn response(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    }
}

pub fn json(body: serde_json::Value) -> HttpResponse {
    response(200, &body.to_string())
}

pub fn timeout_error() -> BridgeError {
    BridgeError::Timeout("request exceeded 15s".to_string())
}

pub fn stream(status: u16, content_length: Option<u64>, body: &'static [u8]) -> DownloadStream {
    DownloadStream {
        status,
        content_length,
        reader: Box::new(body),
    }
}
