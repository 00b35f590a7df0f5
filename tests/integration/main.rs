//! Integration tests for marksmith
//!
//! Each module drives full runs against a wiremock stand-in for the
//! backend API and asserts on the manifest, the error log, and the
//! Markdown artifacts left on disk.

mod scrape_tests;
