//! Configuration module for marksmith
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use marksmith::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("marksmith.toml")).unwrap();
//! println!("Backend API: {}", config.backend.api_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types and constants
pub use types::{
    default_install_dir, BackendConfig, Config, RetryConfig, RunConfig, ServerConfig,
    BACKEND_REPO_URL, DEFAULT_API_URL, HEALTH_ENDPOINT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub use validation::validate;
