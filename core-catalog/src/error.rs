use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP error {status}")]
    Http { status: u16 },

    #[error("Catalog service is busy")]
    ServiceBusy,

    #[error("Catalog returned code {code:?}: {message}")]
    Api { code: Option<i64>, message: String },

    #[error("Catalog returned no data")]
    MissingData,

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Image processing error: {0}")]
    Image(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Failures that say nothing about the request itself: the service was
    /// unreachable, slow, overloaded or answered with something unreadable.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::Timeout(_)
                | CatalogError::Network(_)
                | CatalogError::ServiceBusy
                | CatalogError::JsonParse(_)
        )
    }
}

impl From<BridgeError> for CatalogError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout(message) => CatalogError::Timeout(message),
            other => CatalogError::Network(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Audio download failures. None of these are retried.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Track has no download URL")]
    MissingUrl,

    #[error("Download failed: {0}")]
    Network(String),

    #[error("Download failed with HTTP {status}")]
    Http { status: u16 },

    #[error("File system error: {0}")]
    FileSystem(#[source] BridgeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_timeout_maps_to_timeout() {
        let err: CatalogError = BridgeError::Timeout("10s elapsed".to_string()).into();
        assert!(matches!(err, CatalogError::Timeout(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_bridge_errors_map_to_network() {
        let err: CatalogError = BridgeError::Transport("connection reset".to_string()).into();
        assert!(matches!(err, CatalogError::Network(ref m) if m.contains("connection reset")));
        assert!(err.is_transient());
    }

    #[test]
    fn test_terminal_errors_are_not_transient() {
        assert!(!CatalogError::Http { status: 404 }.is_transient());
        assert!(!CatalogError::MissingData.is_transient());
        assert!(!CatalogError::Api {
            code: Some(400),
            message: "bad id".to_string()
        }
        .is_transient());
    }
}
