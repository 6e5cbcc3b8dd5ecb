//! Units of work accepted by the task bridge and the results they produce.

use core_catalog::{
    CatalogError, CatalogOutcome, CatalogQuery, CoverImage, DownloadError, DownloadReport,
    TrackDetail, TrackSummary,
};
use std::fmt;
use std::path::PathBuf;

/// Sequence number assigned to every submission, increasing per bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Search {
        keyword: String,
    },
    FetchById {
        id: String,
    },
    /// Detail lookup ahead of a download. The names are the ones the user saw
    /// when choosing the track and travel with the result unchanged.
    FetchForDownload {
        id: String,
        display_name: String,
        artist_name: String,
    },
    FetchCover {
        url: String,
    },
    /// A relative `destination` is resolved against the download directory.
    Download {
        url: String,
        destination: PathBuf,
    },
}

impl Operation {
    pub fn search(keyword: impl Into<String>) -> Self {
        Operation::Search {
            keyword: keyword.into(),
        }
    }

    pub fn fetch_by_id(id: impl Into<String>) -> Self {
        Operation::FetchById { id: id.into() }
    }

    pub fn fetch_for_download(
        id: impl Into<String>,
        display_name: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Operation::FetchForDownload {
            id: id.into(),
            display_name: display_name.into(),
            artist_name: artist_name.into(),
        }
    }

    /// Maps search box input onto a search or a direct lookup.
    pub fn from_query(query: CatalogQuery) -> Self {
        match query {
            CatalogQuery::Keyword(keyword) => Operation::Search { keyword },
            CatalogQuery::ById(id) => Operation::FetchById { id },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Search { .. } => "search",
            Operation::FetchById { .. } => "fetch_by_id",
            Operation::FetchForDownload { .. } => "fetch_for_download",
            Operation::FetchCover { .. } => "fetch_cover",
            Operation::Download { .. } => "download",
        }
    }

    pub fn is_download(&self) -> bool {
        matches!(self, Operation::Download { .. })
    }

    /// The result delivered when the operation died before producing one.
    pub(crate) fn failure(&self, message: String) -> TaskResult {
        match self {
            Operation::Search { .. } => {
                TaskResult::Search(CatalogOutcome::Failure(CatalogError::Internal(message)))
            }
            Operation::FetchById { .. } => {
                TaskResult::Detail(CatalogOutcome::Failure(CatalogError::Internal(message)))
            }
            Operation::FetchForDownload {
                display_name,
                artist_name,
                ..
            } => TaskResult::DownloadInfo(DownloadInfo {
                display_name: display_name.clone(),
                artist_name: artist_name.clone(),
                outcome: CatalogOutcome::Failure(CatalogError::Internal(message)),
            }),
            Operation::FetchCover { .. } => TaskResult::Cover(Err(CatalogError::Internal(message))),
            Operation::Download { .. } => TaskResult::Download(Err(DownloadError::Internal(message))),
        }
    }
}

/// Detail lookup result for the download flow.
#[derive(Debug)]
pub struct DownloadInfo {
    pub display_name: String,
    pub artist_name: String,
    pub outcome: CatalogOutcome<TrackDetail>,
}

impl DownloadInfo {
    /// `"<display name> - <artist>.mp3"`, safe to use as a file name.
    pub fn suggested_file_name(&self) -> String {
        core_catalog::suggested_file_name(&self.display_name, &self.artist_name)
    }
}

#[derive(Debug)]
pub enum TaskResult {
    Search(CatalogOutcome<Vec<TrackSummary>>),
    Detail(CatalogOutcome<TrackDetail>),
    DownloadInfo(DownloadInfo),
    Cover(Result<CoverImage, CatalogError>),
    Download(Result<DownloadReport, DownloadError>),
}

impl TaskResult {
    /// `success`, `empty` or `failure`.
    pub fn outcome_kind(&self) -> &'static str {
        match self {
            TaskResult::Search(outcome) => outcome.kind(),
            TaskResult::Detail(outcome) => outcome.kind(),
            TaskResult::DownloadInfo(info) => info.outcome.kind(),
            TaskResult::Cover(result) => result_kind(result),
            TaskResult::Download(result) => result_kind(result),
        }
    }
}

fn result_kind<T, E>(result: &Result<T, E>) -> &'static str {
    if result.is_ok() {
        "success"
    } else {
        "failure"
    }
}
