//! Markdown artifact writing with optional YAML front matter

use crate::backend::ScrapeResult;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

use super::make_filename;

/// Generates a YAML front matter block for a scrape result
///
/// Includes the delimiters and a trailing newline; the caller appends the
/// body after a blank line.
pub fn generate_front_matter(result: &ScrapeResult) -> String {
    let mut fm = String::new();
    fm.push_str("---\n");
    fm.push_str(&format!("url: {}\n", result.url));

    if let Some(title) = result.title.as_deref().filter(|t| !t.is_empty()) {
        let escaped = title.replace('"', "\\\"");
        fm.push_str(&format!("title: \"{}\"\n", escaped));
    }

    if let Some(source_url) = result.source_url.as_deref().filter(|s| !s.is_empty()) {
        if source_url != result.url {
            fm.push_str(&format!("source_url: {}\n", source_url));
        }
    }

    fm.push_str(&format!("scraped_at: {}\n", result.scraped_at.to_rfc3339()));

    if let Some(code) = result.status_code {
        fm.push_str(&format!("status_code: {}\n", code));
    }

    fm.push_str("---\n");
    fm
}

/// Writes a scrape result to a Markdown file in `output_dir`
///
/// Creates the directory if needed and returns the path written.
pub fn write_markdown(
    output_dir: &Path,
    result: &ScrapeResult,
    index: Option<usize>,
    front_matter: bool,
) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;

    let filename = make_filename(&result.url, index);
    let filepath = output_dir.join(&filename);

    let body = result.markdown.as_deref().unwrap_or("");
    let content = if front_matter {
        format!("{}\n{}", generate_front_matter(result), body)
    } else {
        body.to_string()
    };

    fs::write(&filepath, content)?;

    Ok(filepath)
}
