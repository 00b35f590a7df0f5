//! Append-only manifest store with the resume predicate
//!
//! The manifest file is opened once in append mode and every write goes
//! through one lock; that lock is the only serialization point shared by
//! concurrent scrape lanes. An in-memory last-wins index is built from a
//! single startup scan and kept current by `append`, so `is_done` never
//! reads stale state within a run.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

use super::{ErrorEntry, ManifestEntry, ERRORS_FILENAME, MANIFEST_FILENAME};

/// Errors from manifest persistence
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

struct StoreInner {
    writer: File,
    error_writer: Option<File>,
    index: HashMap<String, ManifestEntry>,
}

/// Append-only record of per-URL outcomes
pub struct ManifestStore {
    manifest_path: PathBuf,
    error_path: PathBuf,
    inner: Mutex<StoreInner>,
}

impl ManifestStore {
    /// Opens (or creates) the manifest in `out_dir`
    ///
    /// Scans any existing manifest once to build the resume index, then
    /// holds the file open in append mode for the life of the store.
    pub fn open(out_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(out_dir)?;

        let manifest_path = out_dir.join(MANIFEST_FILENAME);
        let error_path = out_dir.join(ERRORS_FILENAME);

        let index = load_manifest(&manifest_path)?;
        if !index.is_empty() {
            tracing::debug!(
                "loaded manifest with {} recorded urls from {}",
                index.len(),
                manifest_path.display()
            );
        }

        let writer = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&manifest_path)?;

        Ok(Self {
            manifest_path,
            error_path,
            inner: Mutex::new(StoreInner {
                writer,
                error_writer: None,
                index,
            }),
        })
    }

    /// Path of the manifest file
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Path of the permanent-error log
    pub fn error_path(&self) -> &Path {
        &self.error_path
    }

    /// The resume predicate: true iff the last entry for `url` has status
    /// `ok` and a 2xx page status
    pub async fn is_done(&self, url: &str) -> bool {
        let inner = self.inner.lock().await;
        inner
            .index
            .get(url)
            .map(|entry| entry.satisfies_resume())
            .unwrap_or(false)
    }

    /// Returns the effective (last-written) entry for `url`, if any
    pub async fn entry_for(&self, url: &str) -> Option<ManifestEntry> {
        let inner = self.inner.lock().await;
        inner.index.get(url).cloned()
    }

    /// Number of distinct URLs with at least one entry
    pub async fn recorded_urls(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.index.len()
    }

    /// Durably appends one manifest line
    ///
    /// The line is serialized first and written with a single call, so a
    /// completed append never leaves a truncated tail behind.
    pub async fn append(&self, entry: &ManifestEntry) -> StoreResult<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let mut inner = self.inner.lock().await;
        inner.writer.write_all(line.as_bytes())?;
        inner.writer.flush()?;
        inner.index.insert(entry.url.clone(), entry.clone());
        Ok(())
    }

    /// Appends to the permanent-error log
    ///
    /// Entries whose status is not `error` are skipped silently; the
    /// error log records permanent failures only.
    pub async fn append_error(&self, entry: &ManifestEntry) -> StoreResult<()> {
        let error_entry = match ErrorEntry::from_manifest(entry) {
            Some(e) => e,
            None => return Ok(()),
        };

        let mut line = serde_json::to_string(&error_entry)?;
        line.push('\n');

        let mut inner = self.inner.lock().await;
        if inner.error_writer.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.error_path)?;
            inner.error_writer = Some(file);
        }
        if let Some(writer) = inner.error_writer.as_mut() {
            writer.write_all(line.as_bytes())?;
            writer.flush()?;
        }
        Ok(())
    }
}

/// Scans a manifest file into a last-wins index
///
/// A missing file yields an empty index. Blank lines and lines that fail
/// to parse are skipped, so a manifest damaged by an unclean shutdown
/// never blocks a resume.
fn load_manifest(path: &Path) -> StoreResult<HashMap<String, ManifestEntry>> {
    let mut index = HashMap::new();

    if !path.exists() {
        return Ok(index);
    }

    let content = std::fs::read_to_string(path)?;
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ManifestEntry>(line) {
            Ok(entry) => {
                index.insert(entry.url.clone(), entry);
            }
            Err(e) => {
                tracing::debug!(
                    "skipping unparseable manifest line {} in {}: {}",
                    lineno + 1,
                    path.display(),
                    e
                );
            }
        }
    }

    Ok(index)
}
