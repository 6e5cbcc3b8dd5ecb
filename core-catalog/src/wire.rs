//! JSON payloads returned by the catalog service.
//!
//! Both endpoints answer with `{code, data, msg?}`. Ids arrive as numbers or
//! strings depending on the upstream source, and optional fields are often
//! absent rather than null.

use crate::error::{CatalogError, Result};
use crate::models::{TrackDetail, TrackSummary, UNKNOWN_LABEL};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Success code used both in the envelope and as the HTTP status.
pub(crate) const CODE_OK: i64 = 200;

/// Envelope code signalling the service is temporarily overloaded.
pub(crate) const CODE_BUSY: i64 = 503;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub data: Value,
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
}

impl Envelope {
    pub fn decode(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body)
            .map_err(|e| CatalogError::JsonParse(format!("Malformed catalog response: {}", e)))
    }

    /// The data field, or `None` when it is absent or empty.
    pub fn payload(&self) -> Option<&Value> {
        let empty = match &self.data {
            Value::Null => true,
            Value::Bool(flag) => !flag,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(fields) => fields.is_empty(),
            Value::Number(_) => false,
        };
        (!empty).then_some(&self.data)
    }

    pub fn api_error(&self) -> CatalogError {
        CatalogError::Api {
            code: self.code,
            message: self.msg.clone().unwrap_or_default(),
        }
    }

    /// Search results in catalog order. Entries without a usable id are
    /// skipped.
    pub fn search_results(&self) -> Vec<TrackSummary> {
        let Some(Value::Array(entries)) = self.payload() else {
            return Vec::new();
        };

        entries
            .iter()
            .filter_map(|entry| match WireSong::deserialize(entry) {
                Ok(song) => song.into_summary(),
                Err(e) => {
                    debug!(error = %e, "Skipping malformed search entry");
                    None
                }
            })
            .collect()
    }

    /// Track detail, using `requested_id` when the payload omits its own id.
    pub fn detail(&self, requested_id: &str) -> Result<TrackDetail> {
        let data = self.payload().ok_or(CatalogError::MissingData)?;
        let detail = WireDetail::deserialize(data).map_err(|e| {
            debug!(error = %e, "Detail payload has unexpected shape");
            CatalogError::MissingData
        })?;
        Ok(detail.into_detail(requested_id))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    fn into_string(self) -> Option<String> {
        match self {
            WireId::Number(n) => Some(n.to_string()),
            WireId::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireSong {
    #[serde(default)]
    id: Option<WireId>,
    #[serde(default)]
    song: Option<String>,
    #[serde(default)]
    singer: Option<String>,
}

impl WireSong {
    fn into_summary(self) -> Option<TrackSummary> {
        let id = self.id?.into_string()?;
        Some(TrackSummary {
            id,
            title: self.song.unwrap_or_default(),
            artist: self.singer.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireDetail {
    #[serde(default)]
    id: Option<WireId>,
    #[serde(default)]
    song: Option<String>,
    #[serde(default)]
    singer: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    cover: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl WireDetail {
    fn into_detail(self, requested_id: &str) -> TrackDetail {
        TrackDetail {
            id: self
                .id
                .and_then(WireId::into_string)
                .unwrap_or_else(|| requested_id.to_string()),
            title: self.song.unwrap_or_default(),
            artist: self.singer.unwrap_or_default(),
            album: non_empty(self.album).unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            duration_label: non_empty(self.interval).unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            size_label: non_empty(self.size).unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
            cover_url: non_empty(self.cover),
            download_url: non_empty(self.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_envelope_with_mixed_ids() {
        let body = br#"{
            "code": 200,
            "msg": "ok",
            "data": [
                {"id": 186016, "song": "Sunny Day", "singer": "Jay Chou", "album": "Ye Hui Mei"},
                {"id": "5257138", "song": "Blue and White Porcelain", "singer": "Jay Chou"},
                {"song": "no id here"}
            ]
        }"#;

        let envelope = Envelope::decode(body).unwrap();
        let results = envelope.search_results();

        assert_eq!(envelope.code, Some(CODE_OK));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "186016");
        assert_eq!(results[1].id, "5257138");
        assert_eq!(results[1].title, "Blue and White Porcelain");
    }

    #[test]
    fn test_empty_payload_shapes() {
        for body in [
            r#"{"code":200}"#,
            r#"{"code":200,"data":null}"#,
            r#"{"code":200,"data":[]}"#,
            r#"{"code":200,"data":{}}"#,
            r#"{"code":200,"data":""}"#,
        ] {
            let envelope = Envelope::decode(body.as_bytes()).unwrap();
            assert!(envelope.payload().is_none(), "{body}");
            assert!(envelope.search_results().is_empty());
        }
    }

    #[test]
    fn test_detail_defaults() {
        let body = br#"{"code":200,"data":{"song":"Sunny Day","singer":"Jay Chou","cover":"","url":"https://cdn.example.com/a.mp3"}}"#;
        let detail = Envelope::decode(body).unwrap().detail("186016").unwrap();

        assert_eq!(detail.id, "186016");
        assert_eq!(detail.album, UNKNOWN_LABEL);
        assert_eq!(detail.duration_label, UNKNOWN_LABEL);
        assert_eq!(detail.size_label, UNKNOWN_LABEL);
        assert_eq!(detail.cover_url, None);
        assert_eq!(
            detail.download_url.as_deref(),
            Some("https://cdn.example.com/a.mp3")
        );
    }

    #[test]
    fn test_detail_with_wrong_shape_is_missing_data() {
        let envelope = Envelope::decode(br#"{"code":200,"data":[1,2,3]}"#).unwrap();
        assert!(matches!(
            envelope.detail("1"),
            Err(CatalogError::MissingData)
        ));
    }

    #[test]
    fn test_message_alias_and_api_error() {
        let envelope = Envelope::decode(br#"{"code":404,"message":"not found"}"#).unwrap();
        match envelope.api_error() {
            CatalogError::Api { code, message } => {
                assert_eq!(code, Some(404));
                assert_eq!(message, "not found");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_body_is_json_error() {
        assert!(matches!(
            Envelope::decode(b"<html>502 Bad Gateway</html>"),
            Err(CatalogError::JsonParse(_))
        ));
    }
}
