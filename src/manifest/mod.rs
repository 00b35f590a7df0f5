//! Manifest module for marksmith
//!
//! The manifest is the crash-safe, append-only record that makes batch
//! runs resumable:
//!
//! - `ManifestEntry` / `ErrorEntry`: the JSONL line formats
//! - `ManifestStore`: serialized appends plus the `is_done` resume
//!   predicate
//!
//! The permanent-error log lives next to the manifest but is disjoint
//! from it; exhausted retries never appear there.

mod entry;
mod store;

// Re-export main types
pub use entry::{ErrorEntry, ManifestEntry};
pub use store::{ManifestStore, StoreError, StoreResult};

/// Manifest filename inside the output directory
pub const MANIFEST_FILENAME: &str = "manifest.jsonl";

/// Permanent-error log filename inside the output directory
pub const ERRORS_FILENAME: &str = "errors.jsonl";
