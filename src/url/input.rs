//! URL-file parsing and output-directory resolution

use crate::{InputError, InputResult};
use std::fs;
use std::path::{Path, PathBuf};

use super::is_url;

/// Parses a file containing URLs, one per line
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_url_file(path: &Path) -> InputResult<Vec<String>> {
    let content = fs::read_to_string(path)?;
    let urls = content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_string())
        .collect();
    Ok(urls)
}

/// Resolves the raw CLI input into the list of URLs to scrape
///
/// A URL input yields a single-element list. Anything else is treated as a
/// path to a URL file; a missing or empty file is an error, since the run
/// would have nothing to do and that is almost always an operator mistake.
pub fn resolve_input(input: &str) -> InputResult<Vec<String>> {
    if is_url(input) {
        return Ok(vec![input.trim().to_string()]);
    }

    let path = Path::new(input);
    if !path.exists() {
        return Err(InputError::FileNotFound(input.to_string()));
    }

    let urls = parse_url_file(path)?;
    if urls.is_empty() {
        return Err(InputError::Empty(input.to_string()));
    }
    Ok(urls)
}

/// Determines the output directory for a run
///
/// An explicit `--out` always wins. Otherwise a URL input writes to the
/// current directory and a file input writes to a directory named after
/// the file's stem.
pub fn resolve_output_dir(input: &str, explicit_out: Option<&Path>) -> PathBuf {
    if let Some(out) = explicit_out {
        return out.to_path_buf();
    }

    if is_url(input) {
        return PathBuf::from(".");
    }

    let stem = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    PathBuf::from(stem)
}
