//! Output module for marksmith
//!
//! This module handles everything that touches the artifact files:
//!
//! - Filename generation (sanitized host/path slug plus a short URL hash)
//! - YAML front matter rendering
//! - Writing scraped Markdown to disk

mod filename;
mod markdown;

// Re-export main functions
pub use filename::{make_filename, sanitize_for_filename, url_hash};
pub use markdown::{generate_front_matter, write_markdown};
