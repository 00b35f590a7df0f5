use serde::Deserialize;
use std::path::PathBuf;

/// Default API base URL for the local backend
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3002";

/// Health probe path on the backend
pub const HEALTH_ENDPOINT: &str = "/v0/health/liveness";

/// Upstream repository `server install` clones
pub const BACKEND_REPO_URL: &str = "https://github.com/mendableai/firecrawl.git";

/// Main configuration structure for marksmith
///
/// Every section and field has a default, so an empty file (or no file
/// at all) yields a working configuration. CLI flags override whatever
/// the file provides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Backend HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the scrape API
    #[serde(rename = "api-url")]
    pub api_url: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    /// Delay between batch job status polls (seconds)
    #[serde(rename = "poll-interval-secs")]
    pub poll_interval_secs: u64,

    /// Overall deadline for a batch job (seconds)
    #[serde(rename = "poll-timeout-secs")]
    pub poll_timeout_secs: u64,

    /// Health probe timeout (seconds)
    #[serde(rename = "health-timeout-secs")]
    pub health_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 60,
            poll_interval_secs: 2,
            poll_timeout_secs: 600,
            health_timeout_secs: 5,
        }
    }
}

/// Retry behavior for transient failures
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retry attempts after the first try
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// First backoff delay (seconds); doubles per retry
    #[serde(rename = "base-delay-secs")]
    pub base_delay_secs: f64,

    /// Backoff ceiling (seconds)
    #[serde(rename = "max-backoff-secs")]
    pub max_backoff_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 5,
            base_delay_secs: 1.0,
            max_backoff_secs: 32.0,
        }
    }
}

/// Batch run behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Upper bound for the random politeness delay between URLs (seconds)
    #[serde(rename = "delay-secs")]
    pub delay_secs: f64,

    /// Concurrent scrape lanes; 1 means strictly sequential
    pub concurrency: usize,

    /// Wait before the second pass over exhausted URLs (seconds)
    #[serde(rename = "cooldown-secs")]
    pub cooldown_secs: u64,

    /// Use the backend-native batch endpoint for the main pass
    pub batch: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            delay_secs: 1.0,
            concurrency: 1,
            cooldown_secs: 30,
            batch: false,
        }
    }
}

/// Local backend stack configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Where the backend checkout lives
    #[serde(rename = "install-dir")]
    pub install_dir: PathBuf,

    /// Host interface the published API port binds to
    #[serde(rename = "api-host")]
    pub api_host: String,

    /// Published API port
    #[serde(rename = "api-port")]
    pub api_port: u16,

    /// Queue worker count inside the backend
    pub workers: u32,

    /// Deadline for the stack to answer health checks after start (seconds)
    #[serde(rename = "readiness-timeout-secs")]
    pub readiness_timeout_secs: u64,

    /// Repository cloned by `server install`
    #[serde(rename = "repo-url")]
    pub repo_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            install_dir: default_install_dir(),
            api_host: "127.0.0.1".to_string(),
            api_port: 3002,
            workers: 2,
            readiness_timeout_secs: 120,
            repo_url: BACKEND_REPO_URL.to_string(),
        }
    }
}

/// Platform data directory for the managed checkout
/// (`~/.local/share/marksmith/firecrawl` on Linux)
pub fn default_install_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("marksmith")
        .join("firecrawl")
}
