//! Filename generation for scraped Markdown artifacts

use sha2::{Digest, Sha256};
use url::Url;

/// Sanitizes text for use in a filename
///
/// Path separators become underscores, anything outside
/// `[A-Za-z0-9._-]` is dropped, runs of separators collapse to a single
/// underscore, and edge punctuation is trimmed before truncating to
/// `max_length` characters.
pub fn sanitize_for_filename(text: &str, max_length: usize) -> String {
    let mut out = String::with_capacity(text.len().min(max_length + 8));
    let mut pending_sep = false;

    for c in text.chars() {
        match c {
            '/' | '\\' | '_' | '-' => pending_sep = true,
            c if c.is_ascii_alphanumeric() || c == '.' => {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.push(c);
            }
            _ => {}
        }
    }

    let trimmed = out.trim_matches(|c: char| c == '_' || c == '.');
    trimmed.chars().take(max_length).collect()
}

/// Returns a short stable hash of a URL
///
/// First `length` hex characters of the SHA-256 digest.
pub fn url_hash(url: &str, length: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest.chars().take(length).collect()
}

/// Generates a stable, collision-resistant filename for a URL
///
/// Scheme: `{index}_{host}_{path_slug}__{hash}.md`. The index is 1-based
/// and zero-padded when present; the hash suffix keeps two URLs that
/// sanitize identically from colliding.
pub fn make_filename(url: &str, index: Option<usize>) -> String {
    let (host, path) = match Url::parse(url) {
        Ok(parsed) => {
            let host = match (parsed.host_str(), parsed.port()) {
                (Some(h), Some(p)) => format!("{}_{}", h, p),
                (Some(h), None) => h.to_string(),
                _ => "unknown".to_string(),
            };
            (host, parsed.path().to_string())
        }
        Err(_) => ("unknown".to_string(), String::new()),
    };

    let host = sanitize_for_filename(&host, 30);

    let path = path.trim_matches('/');
    let path_slug = if path.is_empty() {
        "index".to_string()
    } else {
        sanitize_for_filename(path, 40)
    };

    let hash_suffix = url_hash(url, 10);

    let mut parts = Vec::new();
    if let Some(i) = index {
        parts.push(format!("{:04}", i));
    }
    parts.push(host.clone());
    if !path_slug.is_empty() && path_slug != host {
        parts.push(path_slug);
    }

    format!("{}__{}.md", parts.join("_"), hash_suffix)
}
