//! Input handling for marksmith
//!
//! This module classifies the raw CLI input (URL vs. URL file), parses URL
//! files, and resolves the output directory. All of it is pure, stateless
//! plumbing that runs before the orchestrator sees the request list.

mod input;

// Re-export main functions
pub use input::{parse_url_file, resolve_input, resolve_output_dir};

/// Input classification types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Input is a single absolute http(s) URL
    Url,
    /// Input is a path to a file of URLs, one per line
    UrlFile,
}

impl InputKind {
    /// Returns true if the input is a single URL
    pub fn is_url(&self) -> bool {
        matches!(self, Self::Url)
    }

    /// Returns true if the input is a URL file
    pub fn is_file(&self) -> bool {
        matches!(self, Self::UrlFile)
    }
}

/// Classifies raw input text as a URL or a URL-file path
///
/// Anything beginning with `http://` or `https://` (case-insensitive,
/// leading whitespace ignored) is a URL; everything else is treated as a
/// file path. The check is deliberately shallow so that malformed URLs
/// still reach the backend and fail with a real error there.
pub fn classify_input(text: &str) -> InputKind {
    if is_url(text) {
        InputKind::Url
    } else {
        InputKind::UrlFile
    }
}

/// Returns true if the text looks like an http(s) URL
pub fn is_url(text: &str) -> bool {
    let head: String = text.trim().chars().take(8).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("http://") || head.starts_with("https://")
}
