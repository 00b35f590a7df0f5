//! Backend module for marksmith
//!
//! Everything that talks to (or rules on answers from) the local scraping
//! backend:
//!
//! - `classify` / `Verdict`: pure classification of HTTP outcomes
//! - `with_retry` / `RetryPolicy`: generic execute-with-backoff driver
//! - `BackendClient`: scrape, batch-scrape with polling, health probe
//! - Request/result types and the backend's JSON wire envelopes

mod classify;
mod client;
mod retry;
mod types;

// Re-export main types
pub use classify::{classify, classify_result, Verdict};
pub use client::{BackendClient, BatchOutcome};
pub use retry::{with_retry, FinalVerdict, RetryOutcome, RetryPolicy};
pub use types::{
    BatchJobStatus, BatchStatusEnvelope, BatchSubmitEnvelope, PageData, PageMetadata,
    ScrapeEnvelope, ScrapeRequest, ScrapeResult,
};
