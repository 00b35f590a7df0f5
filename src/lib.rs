//! Marksmith: batch web-to-Markdown scraping against a local backend
//!
//! This crate drives a locally hosted scraping stack to convert web pages
//! into Markdown files at scale, with retry-aware error handling and an
//! append-only manifest that makes large batches resumable.

pub mod backend;
pub mod config;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod server;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for marksmith operations
#[derive(Debug, Error)]
pub enum MarksmithError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Manifest error: {0}")]
    Store(#[from] manifest::StoreError),

    #[error("Server error: {0}")]
    Server(#[from] server::ServerError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid API URL: {0}")]
    InvalidApiUrl(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Input-resolution errors
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read URL file: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL file not found: {0}")]
    FileNotFound(String),

    #[error("URL file contains no URLs: {0}")]
    Empty(String),
}

/// Result type alias for marksmith operations
pub type Result<T> = std::result::Result<T, MarksmithError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for input resolution
pub type InputResult<T> = std::result::Result<T, InputError>;

// Re-export commonly used types
pub use config::Config;
pub use orchestrator::{run_scrape, RunPlan, RunSummary, ServerPolicy, ShutdownPolicy};
pub use state::{ScrapeStatus, ServiceState};
pub use url::{classify_input, is_url, resolve_input, resolve_output_dir, InputKind};
