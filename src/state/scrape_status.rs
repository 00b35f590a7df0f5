/// Per-URL outcome statuses recorded in the manifest
///
/// Every manifest line carries one of these statuses. The distinction
/// between `Error` and `Exhausted` matters for the error log: permanent
/// failures are mirrored there, exhausted retries are not.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome status for a single scrape attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    /// Scrape succeeded and the Markdown artifact was written
    Ok,

    /// Permanent failure; retrying cannot help (also mirrored to the error log)
    Error,

    /// Transient failure that survived every retry including the second pass
    Exhausted,
}

impl ScrapeStatus {
    /// Returns true if this status represents a successful scrape
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Returns true if this status represents a permanent failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns true if the URL should be attempted again on a future run
    ///
    /// Both `Error` and `Exhausted` leave the URL eligible for resume;
    /// a permanent failure may have been fixed upstream since.
    pub fn is_retryable_on_resume(&self) -> bool {
        !matches!(self, Self::Ok)
    }

    /// Converts the status to the string stored in manifest lines
    pub fn to_manifest_string(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Exhausted => "exhausted",
        }
    }

    /// Parses a status from its manifest string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_manifest_string(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(Self::Ok),
            "error" => Some(Self::Error),
            "exhausted" => Some(Self::Exhausted),
            _ => None,
        }
    }

    /// Returns all possible scrape statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Ok, Self::Error, Self::Exhausted]
    }
}

impl fmt::Display for ScrapeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_manifest_string())
    }
}
