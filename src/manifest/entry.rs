//! Line formats for the manifest and the permanent-error log

use crate::state::ScrapeStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One manifest line: the persisted projection of a scrape attempt
///
/// Entries are append-only. The effective record for a URL is the last
/// line matching it; nothing is ever rewritten in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// The URL as requested
    pub url: String,

    /// Artifact filename relative to the output directory; empty when the
    /// attempt produced no file
    pub file: String,

    /// Outcome status
    pub status: ScrapeStatus,

    /// When the attempt finished
    pub ts: DateTime<Utc>,

    /// Page title, when the backend reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status of the fetched page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    /// Error message for failed attempts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ManifestEntry {
    /// Builds an `ok` entry for a written artifact
    pub fn ok(
        url: impl Into<String>,
        file: impl Into<String>,
        title: Option<String>,
        http_status: Option<u16>,
    ) -> Self {
        Self {
            url: url.into(),
            file: file.into(),
            status: ScrapeStatus::Ok,
            ts: Utc::now(),
            title,
            http_status,
            error: None,
        }
    }

    /// Builds an `error` entry for a permanent failure
    pub fn error(
        url: impl Into<String>,
        http_status: Option<u16>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            file: String::new(),
            status: ScrapeStatus::Error,
            ts: Utc::now(),
            title: None,
            http_status,
            error: Some(error.into()),
        }
    }

    /// Builds an `exhausted` entry for a URL that failed transiently
    /// through every retry
    pub fn exhausted(
        url: impl Into<String>,
        http_status: Option<u16>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            file: String::new(),
            status: ScrapeStatus::Exhausted,
            ts: Utc::now(),
            title: None,
            http_status,
            error: Some(error.into()),
        }
    }

    /// Returns true if this entry marks its URL as done for resume
    /// purposes: status `ok` with a 2xx page status
    pub fn satisfies_resume(&self) -> bool {
        self.status.is_ok() && matches!(self.http_status, Some(c) if (200..=299).contains(&c))
    }
}

/// One line of the permanent-error log
///
/// Disjoint from the manifest: only permanent failures land here,
/// exhausted retries never do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub url: String,

    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    pub ts: DateTime<Utc>,
}

impl ErrorEntry {
    /// Projects a manifest entry into the error log
    ///
    /// Returns None unless the entry is a permanent failure.
    pub fn from_manifest(entry: &ManifestEntry) -> Option<Self> {
        if !entry.status.is_error() {
            return None;
        }
        Some(Self {
            url: entry.url.clone(),
            error: entry
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
            http_status: entry.http_status,
            ts: entry.ts,
        })
    }
}
