use crate::config::types::{BackendConfig, Config, RetryConfig, RunConfig, ServerConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_backend_config(&config.backend)?;
    validate_retry_config(&config.retry)?;
    validate_run_config(&config.run)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates backend API settings
fn validate_backend_config(config: &BackendConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid api-url '{}': {}", config.api_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "api-url must use http or https, got '{}'",
            config.api_url
        )));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 600 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be between 1 and 600, got {}",
            config.request_timeout_secs
        )));
    }

    if config.health_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "health-timeout-secs must be >= 1, got {}",
            config.health_timeout_secs
        )));
    }

    if config.poll_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "poll-timeout-secs must be >= 1, got {}",
            config.poll_timeout_secs
        )));
    }

    Ok(())
}

/// Validates retry settings
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be between 0 and 20, got {}",
            config.max_retries
        )));
    }

    if !(config.base_delay_secs > 0.0) {
        return Err(ConfigError::Validation(format!(
            "base-delay-secs must be > 0, got {}",
            config.base_delay_secs
        )));
    }

    if config.max_backoff_secs < config.base_delay_secs {
        return Err(ConfigError::Validation(format!(
            "max-backoff-secs must be >= base-delay-secs ({}), got {}",
            config.base_delay_secs, config.max_backoff_secs
        )));
    }

    Ok(())
}

/// Validates run settings
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 64 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            config.concurrency
        )));
    }

    if !(config.delay_secs >= 0.0) {
        return Err(ConfigError::Validation(format!(
            "delay-secs must be >= 0, got {}",
            config.delay_secs
        )));
    }

    Ok(())
}

/// Validates local stack settings
fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.api_port == 0 {
        return Err(ConfigError::Validation("api-port must be >= 1".to_string()));
    }

    if config.workers < 1 || config.workers > 16 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 16, got {}",
            config.workers
        )));
    }

    if config.api_host.is_empty() {
        return Err(ConfigError::Validation(
            "api-host cannot be empty".to_string(),
        ));
    }

    if config.repo_url.is_empty() {
        return Err(ConfigError::Validation(
            "repo-url cannot be empty".to_string(),
        ));
    }

    Ok(())
}
