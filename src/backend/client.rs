//! HTTP client for the local scraping backend
//!
//! One `BackendClient` is a scoped session: it owns its connection pool
//! and releases it on drop, on every exit path. Single-URL scrapes report
//! failures inside the returned `ScrapeResult` (the retry driver decides
//! what happens next); batch submit and poll surface backend-level
//! failures as errors.

use crate::config::{BackendConfig, HEALTH_ENDPOINT};
use crate::{MarksmithError, Result};
use reqwest::Client;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use url::Url;

use super::types::{
    BatchBody, BatchJobStatus, BatchStatusEnvelope, BatchSubmitEnvelope, ScrapeBody,
    ScrapeEnvelope, ScrapeRequest, ScrapeResult,
};

/// Everything a finished or timed-out batch job produced
#[derive(Debug)]
pub struct BatchOutcome {
    /// Completed pages, deduplicated, in arrival order
    pub results: Vec<ScrapeResult>,

    /// Last observed job state
    pub status: BatchJobStatus,

    /// True when the poll deadline expired before the job settled
    pub timed_out: bool,
}

/// Client for the backend's scrape, batch, and health endpoints
pub struct BackendClient {
    api_url: String,
    client: Client,
    poll_interval: Duration,
    poll_timeout: Duration,
    health_timeout: Duration,
}

impl BackendClient {
    /// Builds a client for the backend at `config.api_url`
    ///
    /// Fails if the API URL does not parse or the HTTP client cannot be
    /// constructed.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let api_url = config.api_url.trim_end_matches('/').to_string();
        Url::parse(&api_url)
            .map_err(|e| MarksmithError::InvalidApiUrl(format!("{}: {}", api_url, e)))?;

        let client = Client::builder()
            .user_agent(concat!("marksmith/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            api_url,
            client,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        })
    }

    /// The API base URL this client talks to (no trailing slash)
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Scrapes a single URL
    ///
    /// Never returns an error: every failure mode is folded into the
    /// `ScrapeResult` so the classifier can rule on it.
    pub async fn scrape(&self, request: &ScrapeRequest) -> ScrapeResult {
        let url = request.url.as_str();
        let endpoint = format!("{}/v1/scrape", self.api_url);
        let body = ScrapeBody::markdown(url);

        let response = match self.client.post(&endpoint).json(&body).send().await {
            Ok(response) => response,
            Err(e) => {
                return ScrapeResult::failure(url, None, format!("request failed: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            // The backend wraps errors in the same envelope when it can
            let message = match response.json::<ScrapeEnvelope>().await {
                Ok(envelope) => envelope
                    .error
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            return ScrapeResult::failure(url, Some(status.as_u16()), message);
        }

        match response.json::<ScrapeEnvelope>().await {
            Ok(envelope) => {
                if envelope.success {
                    if let Some(page) = envelope.data {
                        return ScrapeResult::from_page(url, page);
                    }
                }
                let message = envelope
                    .error
                    .unwrap_or_else(|| "backend returned no page data".to_string());
                ScrapeResult::failure(url, None, message)
            }
            Err(e) => ScrapeResult::failure(url, None, format!("request failed: {}", e)),
        }
    }

    /// Submits a batch job and returns its job id
    pub async fn batch_scrape(&self, urls: &[String]) -> Result<String> {
        let endpoint = format!("{}/v1/batch/scrape", self.api_url);
        let body = BatchBody::markdown(urls);

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| MarksmithError::Http {
                url: endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarksmithError::Backend(format!(
                "batch submit returned HTTP {}",
                status.as_u16()
            )));
        }

        let envelope: BatchSubmitEnvelope =
            response.json().await.map_err(|e| MarksmithError::Http {
                url: endpoint,
                source: e,
            })?;

        if !envelope.success {
            return Err(MarksmithError::Backend(format!(
                "batch submit failed: {}",
                envelope.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }

        envelope
            .job_id()
            .ok_or_else(|| MarksmithError::Backend("batch submit response carried no job id".to_string()))
    }

    /// Polls a batch job until it settles or the poll deadline expires
    ///
    /// Pages are deduplicated across poll responses by their canonical
    /// URL, so a page is yielded exactly once no matter how often the
    /// backend repeats it. On deadline expiry the partial results are
    /// returned with `timed_out` set; the caller treats the missing URLs
    /// as transient failures.
    pub async fn poll_batch(&self, job_id: &str) -> Result<BatchOutcome> {
        let endpoint = format!("{}/v1/batch/scrape/{}", self.api_url, job_id);
        let started = Instant::now();
        let mut seen: HashSet<String> = HashSet::new();
        let mut results: Vec<ScrapeResult> = Vec::new();

        loop {
            let envelope = self.fetch_batch_status(&endpoint).await?;

            for page in envelope.data {
                let key = match page.result_url() {
                    Some(url) => url.to_string(),
                    None => continue,
                };
                if !seen.insert(key.clone()) {
                    continue;
                }
                results.push(ScrapeResult::from_page(&key, page));
            }

            if envelope.status.is_terminal() {
                tracing::debug!(
                    "batch job {} finished with status {:?}, {} pages",
                    job_id,
                    envelope.status,
                    results.len()
                );
                return Ok(BatchOutcome {
                    results,
                    status: envelope.status,
                    timed_out: false,
                });
            }

            if started.elapsed() >= self.poll_timeout {
                tracing::warn!(
                    "batch job {} did not settle within {:?}, keeping {} partial results",
                    job_id,
                    self.poll_timeout,
                    results.len()
                );
                return Ok(BatchOutcome {
                    results,
                    status: envelope.status,
                    timed_out: true,
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Submits a batch job and waits for its outcome
    pub async fn batch_scrape_and_wait(&self, urls: &[String]) -> Result<BatchOutcome> {
        let job_id = self.batch_scrape(urls).await?;
        tracing::info!("submitted batch job {} for {} urls", job_id, urls.len());
        self.poll_batch(&job_id).await
    }

    /// Liveness probe against the backend's health endpoint
    ///
    /// A single short-timeout request; never retried. Any failure means
    /// "not ready yet".
    pub async fn health(&self) -> bool {
        let endpoint = format!("{}{}", self.api_url, HEALTH_ENDPOINT);
        match self
            .client
            .get(&endpoint)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(_) => false,
        }
    }

    async fn fetch_batch_status(&self, endpoint: &str) -> Result<BatchStatusEnvelope> {
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| MarksmithError::Http {
                url: endpoint.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarksmithError::Backend(format!(
                "batch status returned HTTP {}",
                status.as_u16()
            )));
        }

        response.json().await.map_err(|e| MarksmithError::Http {
            url: endpoint.to_string(),
            source: e,
        })
    }
}
