//! Top-level driver for one scrape run
//!
//! The orchestrator ties the other modules together: it filters out URLs
//! the manifest already marks done, brings the backend up per the server
//! policy, dispatches the rest through the retry driver (sequentially,
//! fanned out, or as one backend-native batch job), gives transient
//! stragglers a cooled-down second pass, and finally applies the
//! shutdown policy to the backend.

use crate::backend::{
    classify_result, with_retry, BackendClient, FinalVerdict, RetryOutcome, RetryPolicy,
    ScrapeRequest, ScrapeResult, Verdict,
};
use crate::config::Config;
use crate::manifest::{ManifestEntry, ManifestStore};
use crate::output::write_markdown;
use crate::server::{ContainerRuntime, DockerCompose, ServiceManager};
use crate::{MarksmithError, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::{RunPlan, RunSummary, ServerPolicy, ShutdownPolicy};

/// Drives one scrape run end to end
///
/// Owns the manifest store, the backend client, and the lifecycle
/// manager for the duration of the run. The lifecycle manager is only
/// touched here; scrape lanes never mutate server state.
pub struct Orchestrator<R: ContainerRuntime = DockerCompose> {
    plan: RunPlan,
    client: Arc<BackendClient>,
    store: Arc<ManifestStore>,
    manager: ServiceManager<R>,
    policy: RetryPolicy,
}

impl Orchestrator<DockerCompose> {
    /// Creates an orchestrator wired to the real compose runtime
    pub async fn new(plan: RunPlan, config: &Config) -> Result<Self> {
        let client = Arc::new(BackendClient::new(&config.backend)?);
        let manager = ServiceManager::new(config.server.clone(), Arc::clone(&client)).await;
        Self::with_manager(plan, config, client, manager)
    }
}

impl<R: ContainerRuntime> Orchestrator<R> {
    /// Creates an orchestrator around a caller-supplied lifecycle manager
    pub fn with_manager(
        plan: RunPlan,
        config: &Config,
        client: Arc<BackendClient>,
        manager: ServiceManager<R>,
    ) -> Result<Self> {
        let store = Arc::new(ManifestStore::open(&plan.out_dir)?);
        Ok(Self {
            plan,
            client,
            store,
            manager,
            policy: RetryPolicy::from(&config.retry),
        })
    }

    /// Runs the plan to completion
    ///
    /// Filter, server policy, main pass, second pass, shutdown policy.
    /// A ctrl-c abandons in-flight URLs without writing entries for them
    /// and skips straight to the shutdown policy.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let pending = self.filter_pending(&mut summary).await;
        if summary.skipped > 0 {
            tracing::info!("{} URLs already done, skipping", summary.skipped);
        }
        if pending.is_empty() {
            tracing::info!("nothing left to scrape");
            return Ok(summary);
        }

        let owns_server = self.apply_server_policy().await?;

        // Indexes are fixed over the filtered list so a URL retried in
        // the second pass keeps the filename assigned in the main pass.
        let indexes: HashMap<String, usize> = pending
            .iter()
            .enumerate()
            .map(|(position, url)| (url.clone(), position + 1))
            .collect();

        tracing::info!(
            "scraping {} URLs into {}",
            pending.len(),
            self.plan.out_dir.display()
        );

        tokio::select! {
            result = self.passes(&pending, &indexes, &mut summary) => result?,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("interrupted; abandoning in-flight URLs");
                summary.interrupted = true;
            }
        }

        self.apply_shutdown_policy(owns_server).await?;

        Ok(summary)
    }

    /// Splits the plan's URLs into still-pending work, counting skips
    async fn filter_pending(&self, summary: &mut RunSummary) -> Vec<String> {
        if self.plan.overwrite {
            return self.plan.urls.clone();
        }

        let mut pending = Vec::with_capacity(self.plan.urls.len());
        for url in &self.plan.urls {
            if self.store.is_done(url).await {
                tracing::debug!("already done: {}", url);
                summary.skipped += 1;
            } else {
                pending.push(url.clone());
            }
        }
        pending
    }

    /// Brings the backend into a usable state per the server policy
    ///
    /// Returns true when this invocation started the stack and therefore
    /// owns the teardown decision.
    async fn apply_server_policy(&mut self) -> Result<bool> {
        match self.plan.server_policy {
            ServerPolicy::Never => {
                if self.client.health().await {
                    Ok(false)
                } else {
                    Err(MarksmithError::Backend(format!(
                        "no healthy backend at {} and the server policy forbids starting one",
                        self.client.api_url()
                    )))
                }
            }
            ServerPolicy::Auto => Ok(self.manager.ensure(false).await?),
            ServerPolicy::Always => Ok(self.manager.ensure(true).await?),
        }
    }

    /// Main pass plus, when transient failures remain, the second pass
    async fn passes(
        &self,
        urls: &[String],
        indexes: &HashMap<String, usize>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut pending_retry: Vec<String> = Vec::new();

        if self.plan.batch {
            self.batch_pass(urls, indexes, summary, &mut pending_retry)
                .await?;
        } else if self.plan.concurrency > 1 {
            self.concurrent_pass(urls, indexes, summary, &mut pending_retry)
                .await?;
        } else {
            self.sequential_pass(urls, indexes, summary, &mut pending_retry)
                .await?;
        }

        if !pending_retry.is_empty() {
            self.second_pass(&pending_retry, indexes, summary).await?;
        }
        Ok(())
    }

    /// Processes URLs one at a time with a politeness delay between them
    async fn sequential_pass(
        &self,
        urls: &[String],
        indexes: &HashMap<String, usize>,
        summary: &mut RunSummary,
        pending_retry: &mut Vec<String>,
    ) -> Result<()> {
        for (offset, url) in urls.iter().enumerate() {
            let request = ScrapeRequest::new(url.as_str(), self.plan.front_matter);
            let outcome = drive_scrape(&self.client, &self.policy, &request).await;
            self.route_main(url, indexes.get(url).copied(), outcome, summary, pending_retry)
                .await?;

            if offset + 1 < urls.len() {
                self.politeness_pause().await;
            }
        }
        Ok(())
    }

    /// Fans URLs out over a bounded set of in-flight requests
    ///
    /// Entries are appended as lanes finish, so manifest order may differ
    /// from dispatch order here.
    async fn concurrent_pass(
        &self,
        urls: &[String],
        indexes: &HashMap<String, usize>,
        summary: &mut RunSummary,
        pending_retry: &mut Vec<String>,
    ) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.plan.concurrency));
        let mut tasks: JoinSet<(String, RetryOutcome<ScrapeResult>)> = JoinSet::new();

        for url in urls {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore is never closed while the pass runs
                Err(_) => break,
            };

            let client = Arc::clone(&self.client);
            let policy = self.policy;
            let request = ScrapeRequest::new(url.as_str(), self.plan.front_matter);
            let url = url.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = drive_scrape(&client, &policy, &request).await;
                (url, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((url, outcome)) => {
                    self.route_main(&url, indexes.get(&url).copied(), outcome, summary, pending_retry)
                        .await?;
                }
                Err(join_error) => {
                    tracing::error!("scrape task failed: {}", join_error);
                }
            }
        }
        Ok(())
    }

    /// Sends the whole pending set through the backend's batch endpoint
    ///
    /// Pages the job reports route through the normal per-verdict
    /// bookkeeping; URLs it never reports come back transient so the
    /// second pass picks them up. A failed submit or poll aborts the run.
    async fn batch_pass(
        &self,
        urls: &[String],
        indexes: &HashMap<String, usize>,
        summary: &mut RunSummary,
        pending_retry: &mut Vec<String>,
    ) -> Result<()> {
        tracing::info!("submitting batch job for {} URLs", urls.len());
        let outcome = self.client.batch_scrape_and_wait(urls).await?;
        if outcome.timed_out {
            tracing::warn!("batch job did not settle before the poll deadline");
        }

        let mut reported: HashSet<String> = HashSet::with_capacity(outcome.results.len());
        for result in &outcome.results {
            reported.insert(result.url.clone());
            let index = indexes.get(&result.url).copied();
            match classify_result(result) {
                Verdict::Success => self.record_success(&result.url, index, result, summary).await?,
                Verdict::Permanent => self.record_permanent(&result.url, result, summary).await?,
                Verdict::Transient => {
                    tracing::debug!("transient batch failure for {}", result.url);
                    pending_retry.push(result.url.clone());
                }
            }
        }

        for url in urls {
            if !reported.contains(url) {
                tracing::debug!("batch job never reported {}", url);
                pending_retry.push(url.clone());
            }
        }
        Ok(())
    }

    /// Re-attempts every URL that stayed transient in the main pass
    ///
    /// Runs once, sequentially, after the cooldown. Outcomes route like
    /// the main pass except that a URL still transient here is recorded
    /// as exhausted instead of queued again.
    async fn second_pass(
        &self,
        urls: &[String],
        indexes: &HashMap<String, usize>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        tracing::info!(
            "{} transient URLs left; retrying after a {}s cooldown",
            urls.len(),
            self.plan.cooldown.as_secs()
        );
        tokio::time::sleep(self.plan.cooldown).await;

        for (offset, url) in urls.iter().enumerate() {
            let request = ScrapeRequest::new(url.as_str(), self.plan.front_matter);
            let outcome = drive_scrape(&self.client, &self.policy, &request).await;
            match outcome.verdict {
                FinalVerdict::Success => {
                    self.record_success(url, indexes.get(url).copied(), &outcome.value, summary)
                        .await?;
                }
                FinalVerdict::Permanent => {
                    self.record_permanent(url, &outcome.value, summary).await?;
                }
                FinalVerdict::Exhausted => {
                    self.record_exhausted(url, &outcome, summary).await?;
                }
            }

            if offset + 1 < urls.len() {
                self.politeness_pause().await;
            }
        }
        Ok(())
    }

    /// Applies main-pass bookkeeping for one finished URL
    async fn route_main(
        &self,
        url: &str,
        index: Option<usize>,
        outcome: RetryOutcome<ScrapeResult>,
        summary: &mut RunSummary,
        pending_retry: &mut Vec<String>,
    ) -> Result<()> {
        match outcome.verdict {
            FinalVerdict::Success => {
                self.record_success(url, index, &outcome.value, summary).await?;
            }
            FinalVerdict::Permanent => {
                self.record_permanent(url, &outcome.value, summary).await?;
            }
            FinalVerdict::Exhausted => {
                // No entry yet; the second pass decides this URL's fate
                tracing::debug!("queueing {} for the second pass", url);
                pending_retry.push(url.to_string());
            }
        }
        Ok(())
    }

    /// Writes the artifact and the `ok` manifest line for a success
    async fn record_success(
        &self,
        url: &str,
        index: Option<usize>,
        result: &ScrapeResult,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let path = write_markdown(&self.plan.out_dir, result, index, self.plan.front_matter)?;
        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let entry = ManifestEntry::ok(url, file.clone(), result.title.clone(), result.status_code);
        self.store.append(&entry).await?;
        summary.ok += 1;
        tracing::info!("saved {} as {}", url, file);
        Ok(())
    }

    /// Records a permanent failure in the manifest and the error log
    async fn record_permanent(
        &self,
        url: &str,
        result: &ScrapeResult,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let message = failure_message(result);
        let entry = ManifestEntry::error(url, result.status_code, message.as_str());
        self.store.append(&entry).await?;
        self.store.append_error(&entry).await?;
        summary.permanent += 1;
        tracing::warn!("permanent failure for {}: {}", url, message);
        Ok(())
    }

    /// Records a URL that stayed transient through the second pass
    ///
    /// Manifest only; the error log is reserved for permanent failures.
    async fn record_exhausted(
        &self,
        url: &str,
        outcome: &RetryOutcome<ScrapeResult>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let message = format!("retries exhausted: {}", failure_message(&outcome.value));
        let entry = ManifestEntry::exhausted(url, outcome.value.status_code, message.as_str());
        self.store.append(&entry).await?;
        summary.exhausted += 1;
        tracing::warn!("giving up on {} after {} attempts", url, outcome.attempts);
        Ok(())
    }

    /// Applies the shutdown policy, honoring server ownership
    async fn apply_shutdown_policy(&mut self, owns_server: bool) -> Result<()> {
        if !owns_server {
            tracing::debug!("leaving the backend as found");
            return Ok(());
        }

        match self.plan.shutdown_policy {
            ShutdownPolicy::Stop => {
                tracing::info!("stopping the backend");
                self.manager.stop().await?;
            }
            ShutdownPolicy::Down => {
                tracing::info!("removing the backend containers");
                self.manager.down(false).await?;
            }
            ShutdownPolicy::Keep => {
                tracing::info!("leaving the backend running");
            }
        }
        Ok(())
    }

    /// Sleeps a uniform random fraction of the configured delay
    async fn politeness_pause(&self) {
        if self.plan.delay.is_zero() {
            return;
        }
        let pause = self.plan.delay.mul_f64(fastrand::f64());
        tokio::time::sleep(pause).await;
    }
}

/// Runs one request through the retry driver against `client`
async fn drive_scrape(
    client: &BackendClient,
    policy: &RetryPolicy,
    request: &ScrapeRequest,
) -> RetryOutcome<ScrapeResult> {
    with_retry(policy, |attempt| {
        let request = request.clone();
        async move {
            if attempt > 1 {
                tracing::debug!("attempt {} for {}", attempt, request.url);
            }
            let result = client.scrape(&request).await;
            let verdict = classify_result(&result);
            (result, verdict)
        }
    })
    .await
}

/// Human-readable message for a failed result
fn failure_message(result: &ScrapeResult) -> String {
    match (&result.error, result.status_code) {
        (Some(error), _) => error.clone(),
        (None, Some(code)) => format!("HTTP {}", code),
        (None, None) => "request failed".to_string(),
    }
}

/// Creates an orchestrator against the real compose runtime and runs the
/// plan to completion
pub async fn run_scrape(plan: RunPlan, config: &Config) -> Result<RunSummary> {
    let mut orchestrator = Orchestrator::new(plan, config).await?;
    orchestrator.run().await
}
