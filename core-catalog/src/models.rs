//! Catalog data model.

use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};

/// Placeholder for detail fields the catalog left out.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// One row of a search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: String,
    pub title: String,
    pub artist: String,
}

/// Full metadata for a single track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDetail {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Human-readable duration as reported by the catalog, e.g. `04:13`.
    pub duration_label: String,
    /// Human-readable file size as reported by the catalog, e.g. `9.7MB`.
    pub size_label: String,
    pub cover_url: Option<String>,
    pub download_url: Option<String>,
}

impl TrackDetail {
    pub fn summary(&self) -> TrackSummary {
        TrackSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
        }
    }

    pub fn suggested_file_name(&self) -> String {
        suggested_file_name(&self.title, &self.artist)
    }
}

/// Default file name for a downloaded track: `"<title> - <artist>.mp3"`.
///
/// Characters that are invalid in file names on common platforms are replaced
/// with `_`.
pub fn suggested_file_name(title: &str, artist: &str) -> String {
    let title = sanitize_component(title);
    let artist = sanitize_component(artist);

    match (title.is_empty(), artist.is_empty()) {
        (true, true) => "track.mp3".to_string(),
        (false, true) => format!("{}.mp3", title),
        (true, false) => format!("{}.mp3", artist),
        (false, false) => format!("{} - {}.mp3", title, artist),
    }
}

fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .to_string()
}

/// What the user typed into the search box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogQuery {
    /// Free-text search.
    Keyword(String),
    /// Input made only of ASCII digits is taken as a catalog id.
    ById(String),
}

impl CatalogQuery {
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CatalogError::InvalidInput(
                "Enter a song name, artist or track id".to_string(),
            ));
        }

        if input.chars().all(|c| c.is_ascii_digit()) {
            Ok(CatalogQuery::ById(input.to_string()))
        } else {
            Ok(CatalogQuery::Keyword(input.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail() -> TrackDetail {
        TrackDetail {
            id: "186016".to_string(),
            title: "晴天".to_string(),
            artist: "周杰伦".to_string(),
            album: "叶惠美".to_string(),
            duration_label: "04:29".to_string(),
            size_label: "10.3MB".to_string(),
            cover_url: None,
            download_url: Some("https://cdn.example.com/186016.mp3".to_string()),
        }
    }

    #[test]
    fn test_query_parse() {
        assert_eq!(
            CatalogQuery::parse("  186016 ").unwrap(),
            CatalogQuery::ById("186016".to_string())
        );
        assert_eq!(
            CatalogQuery::parse("jay chou 2004").unwrap(),
            CatalogQuery::Keyword("jay chou 2004".to_string())
        );
        assert_eq!(
            CatalogQuery::parse("-1").unwrap(),
            CatalogQuery::Keyword("-1".to_string())
        );
        assert!(matches!(
            CatalogQuery::parse("   "),
            Err(CatalogError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_suggested_file_name() {
        assert_eq!(detail().suggested_file_name(), "晴天 - 周杰伦.mp3");
        assert_eq!(
            suggested_file_name("AC/DC: Live?", "Band|X"),
            "AC_DC_ Live_ - Band_X.mp3"
        );
        assert_eq!(suggested_file_name("Song", ""), "Song.mp3");
        assert_eq!(suggested_file_name(" ", " "), "track.mp3");
    }

    #[test]
    fn test_summary() {
        let summary = detail().summary();
        assert_eq!(summary.id, "186016");
        assert_eq!(summary.title, "晴天");
    }
}
