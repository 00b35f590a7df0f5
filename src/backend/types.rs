//! Request, result, and wire types for the scraping backend
//!
//! The backend speaks the Firecrawl v1 JSON envelope; the structs here
//! mirror exactly the fields this engine reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single scrape request, immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    /// Absolute http(s) URL to scrape
    pub url: String,

    /// Whether the written artifact should carry a YAML front matter block
    pub want_front_matter: bool,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>, want_front_matter: bool) -> Self {
        Self {
            url: url.into(),
            want_front_matter,
        }
    }
}

/// Outcome of one scrape attempt against the backend
///
/// A retry produces a fresh ScrapeResult; existing values are never
/// mutated.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// The URL as requested
    pub url: String,

    /// Converted Markdown body, when the scrape produced one
    pub markdown: Option<String>,

    /// Page title from backend metadata
    pub title: Option<String>,

    /// Page description from backend metadata
    pub description: Option<String>,

    /// Canonical URL the backend reports having fetched
    pub source_url: Option<String>,

    /// HTTP status of the fetched page (or of the backend call on failure)
    pub status_code: Option<u16>,

    /// Error message when the attempt failed
    pub error: Option<String>,

    /// When this attempt finished
    pub scraped_at: DateTime<Utc>,
}

impl ScrapeResult {
    /// Returns true if the scrape succeeded: 2xx page status and a
    /// non-empty Markdown payload
    pub fn is_success(&self) -> bool {
        let status_ok = matches!(self.status_code, Some(c) if (200..=299).contains(&c));
        status_ok && self.has_content()
    }

    /// Returns true if a non-empty Markdown body is present
    pub fn has_content(&self) -> bool {
        self.markdown.as_deref().map_or(false, |m| !m.is_empty())
    }

    /// Builds a result from a backend page object
    pub fn from_page(requested_url: &str, page: PageData) -> Self {
        let metadata = page.metadata.unwrap_or_default();
        Self {
            url: requested_url.to_string(),
            markdown: page.markdown,
            title: metadata.title,
            description: metadata.description,
            source_url: metadata.source_url,
            status_code: metadata.status_code,
            error: None,
            scraped_at: Utc::now(),
        }
    }

    /// Builds a failed result carrying the error message
    pub fn failure(url: &str, status_code: Option<u16>, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            markdown: None,
            title: None,
            description: None,
            source_url: None,
            status_code,
            error: Some(error.into()),
            scraped_at: Utc::now(),
        }
    }
}

// ===== Wire types (Firecrawl v1) =====

/// Body for `POST /v1/scrape`
#[derive(Debug, Serialize)]
pub struct ScrapeBody {
    pub url: String,
    pub formats: Vec<String>,
}

impl ScrapeBody {
    /// Standard request body asking for Markdown output
    pub fn markdown(url: &str) -> Self {
        Self {
            url: url.to_string(),
            formats: vec!["markdown".to_string()],
        }
    }
}

/// Body for `POST /v1/batch/scrape`
#[derive(Debug, Serialize)]
pub struct BatchBody {
    pub urls: Vec<String>,
    pub formats: Vec<String>,
}

impl BatchBody {
    pub fn markdown(urls: &[String]) -> Self {
        Self {
            urls: urls.to_vec(),
            formats: vec!["markdown".to_string()],
        }
    }
}

/// Page metadata inside a backend response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMetadata {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Canonical URL of the fetched page
    #[serde(rename = "sourceURL", default)]
    pub source_url: Option<String>,

    /// HTTP status the backend saw when fetching the page
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<u16>,
}

/// One scraped page in a backend response
#[derive(Debug, Clone, Deserialize)]
pub struct PageData {
    #[serde(default)]
    pub markdown: Option<String>,

    #[serde(default)]
    pub metadata: Option<PageMetadata>,

    /// Some responses carry the requested URL at the top level
    #[serde(default)]
    pub url: Option<String>,
}

impl PageData {
    /// The URL this page should be keyed under: canonical sourceURL first,
    /// falling back to the top-level url field
    pub fn result_url(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.source_url.as_deref())
            .filter(|s| !s.is_empty())
            .or(self.url.as_deref())
    }
}

/// Envelope for `POST /v1/scrape`
#[derive(Debug, Deserialize)]
pub struct ScrapeEnvelope {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub data: Option<PageData>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Envelope for `POST /v1/batch/scrape`
#[derive(Debug, Deserialize)]
pub struct BatchSubmitEnvelope {
    #[serde(default)]
    pub success: bool,

    /// Job identifier for polling
    #[serde(default)]
    pub id: Option<String>,

    /// Some backend versions return only a polling URL ending in the job id
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

impl BatchSubmitEnvelope {
    /// Extracts the job id, falling back to the last path segment of the
    /// polling URL
    pub fn job_id(&self) -> Option<String> {
        if let Some(id) = self.id.as_deref().filter(|s| !s.is_empty()) {
            return Some(id.to_string());
        }
        self.url
            .as_deref()
            .and_then(|u| u.trim_end_matches('/').rsplit('/').next())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    }
}

/// Job states reported by `GET /v1/batch/scrape/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchJobStatus {
    Scraping,
    Completed,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl BatchJobStatus {
    /// Returns true when the job will make no further progress
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Envelope for `GET /v1/batch/scrape/{id}`
#[derive(Debug, Deserialize)]
pub struct BatchStatusEnvelope {
    pub status: BatchJobStatus,

    #[serde(default)]
    pub total: Option<u64>,

    #[serde(default)]
    pub completed: Option<u64>,

    #[serde(default)]
    pub data: Vec<PageData>,

    #[serde(default)]
    pub error: Option<String>,
}
