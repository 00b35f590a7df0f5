//! Lifecycle manager for the local backend stack
//!
//! Install, start, stop, and probe the docker compose stack that serves
//! the scrape API. Every action is checked against the `ServiceState`
//! machine, while the stack itself is probed live on each operation
//! because this process is not the only possible controller of it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::backend::BackendClient;
use crate::config::ServerConfig;
use crate::server::compose::{
    parse_container_states, ContainerRuntime, ContainerStatus, DockerCompose, ServerError,
    ServerResult,
};
use crate::state::ServiceState;

/// How often `wait_ready` re-probes the health endpoint
const READINESS_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Length of the generated queue auth key
const AUTH_KEY_LEN: usize = 43;

/// Snapshot of the backend stack, assembled from live probes
#[derive(Debug, Clone)]
pub struct ServiceStatus {
    /// Checkout and generated `.env` are both present
    pub installed: bool,
    /// At least one stack container exists
    pub containers_exist: bool,
    /// Every stack container reports `running`
    pub containers_running: bool,
    /// Health endpoint answered 200
    pub healthy: bool,
    /// API base URL the health probe targeted
    pub api_url: String,
}

impl ServiceStatus {
    /// True when the stack can accept scrape requests right now
    pub fn is_ready(&self) -> bool {
        self.healthy
    }
}

/// Manages the backend stack through a [`ContainerRuntime`]
///
/// Generic over the runtime so tests can drive the manager with a
/// scripted fake instead of docker subprocesses.
pub struct ServiceManager<R: ContainerRuntime = DockerCompose> {
    config: ServerConfig,
    client: Arc<BackendClient>,
    runtime: R,
    state: ServiceState,
}

impl ServiceManager<DockerCompose> {
    /// Builds a manager backed by real `docker compose` subprocesses
    pub async fn new(config: ServerConfig, client: Arc<BackendClient>) -> Self {
        Self::with_runtime(config, client, DockerCompose).await
    }
}

impl<R: ContainerRuntime> ServiceManager<R> {
    /// Builds a manager with an explicit runtime, probing initial state
    pub async fn with_runtime(config: ServerConfig, client: Arc<BackendClient>, runtime: R) -> Self {
        let mut manager = ServiceManager {
            config,
            client,
            runtime,
            state: ServiceState::NotInstalled,
        };
        manager.refresh_state().await;
        manager
    }

    /// Current lifecycle state as last observed or transitioned
    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// True when the checkout and its generated `.env` exist
    pub fn is_installed(&self) -> bool {
        self.config.install_dir.exists() && self.config.install_dir.join(".env").exists()
    }

    /// True when the docker daemon answers
    pub async fn docker_available(&self) -> bool {
        self.runtime.docker_available().await
    }

    /// Probes everything: install dir, containers, health
    ///
    /// Never fails; probe errors read as "not there".
    pub async fn status(&self) -> ServiceStatus {
        let installed = self.is_installed();
        let containers = self.probe_containers().await;
        let healthy = self.client.health().await;

        ServiceStatus {
            installed,
            containers_exist: containers.exists,
            containers_running: containers.running,
            healthy,
            api_url: self.client.api_url().to_string(),
        }
    }

    /// Installs the backend stack: clone, write `.env`, drop the
    /// upstream override file
    ///
    /// Idempotent. An existing checkout only gets its config files
    /// rewritten; `force` removes the checkout and clones fresh. Docker
    /// is deliberately not required here, only at start time.
    pub async fn install(&mut self, force: bool) -> ServerResult<()> {
        if let Some(parent) = self.config.install_dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if self.config.install_dir.exists() {
            if force {
                tracing::info!(
                    "removing existing installation at {}",
                    self.config.install_dir.display()
                );
                tokio::fs::remove_dir_all(&self.config.install_dir).await?;
                self.state = ServiceState::NotInstalled;
            } else {
                tracing::info!(
                    "backend already installed at {}; rewriting config files",
                    self.config.install_dir.display()
                );
                self.write_config_files().await?;
                return Ok(());
            }
        }

        tracing::info!(
            "cloning {} into {}",
            self.config.repo_url,
            self.config.install_dir.display()
        );
        self.runtime
            .clone_repo(&self.config.repo_url, &self.config.install_dir)
            .await?;
        self.write_config_files().await?;
        self.transition(ServiceState::Stopped)?;
        Ok(())
    }

    /// Starts the stack in the background, `docker compose up -d`
    ///
    /// Returns as soon as compose does; callers that need a serving
    /// stack follow up with [`wait_ready`](Self::wait_ready).
    pub async fn up(&mut self, build: bool) -> ServerResult<()> {
        if !self.is_installed() {
            return Err(ServerError::NotInstalled);
        }
        self.refresh_state().await;
        if !self.state.is_running() {
            self.transition(ServiceState::Starting)?;
        }

        let mut args = vec!["up", "-d"];
        if build {
            args.push("--build");
        }
        self.runtime.compose(&self.config.install_dir, &args).await?;
        Ok(())
    }

    /// Stops the stack, keeping containers
    pub async fn stop(&mut self) -> ServerResult<()> {
        if !self.is_installed() {
            tracing::warn!("backend service is not installed; nothing to stop");
            return Ok(());
        }
        self.refresh_state().await;
        if self.state.is_running() {
            self.transition(ServiceState::Stopping)?;
        }
        self.runtime
            .compose(&self.config.install_dir, &["stop"])
            .await?;
        self.transition(ServiceState::Stopped)?;
        Ok(())
    }

    /// Stops and removes containers, optionally volumes too
    pub async fn down(&mut self, volumes: bool) -> ServerResult<()> {
        if !self.is_installed() {
            tracing::warn!("backend service is not installed; nothing to remove");
            return Ok(());
        }
        self.refresh_state().await;
        if self.state.is_running() {
            self.transition(ServiceState::Stopping)?;
        }

        let mut args = vec!["down"];
        if volumes {
            args.push("-v");
        }
        self.runtime.compose(&self.config.install_dir, &args).await?;
        self.transition(ServiceState::Stopped)?;
        Ok(())
    }

    /// Streams compose logs to the terminal
    pub async fn logs(&self, follow: bool, tail: Option<u32>) -> ServerResult<()> {
        if !self.is_installed() {
            return Err(ServerError::NotInstalled);
        }

        let mut args: Vec<String> = vec!["logs".to_string()];
        if follow {
            args.push("-f".to_string());
        }
        if let Some(lines) = tail {
            args.push("--tail".to_string());
            args.push(lines.to_string());
        }
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.runtime
            .compose_streaming(&self.config.install_dir, &arg_refs)
            .await
    }

    /// Polls the health endpoint until it answers or `timeout` elapses
    pub async fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.client.health().await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    /// Makes sure the stack is serving, starting it when needed
    ///
    /// Returns `true` only when this call performed the start; callers
    /// use that to decide whether shutdown is theirs to do. A healthy
    /// stack short-circuits to `false` unless `force_start` is set, in
    /// which case the start cycle runs regardless and ownership is
    /// claimed either way.
    pub async fn ensure(&mut self, force_start: bool) -> ServerResult<bool> {
        let status = self.status().await;

        if status.healthy && !force_start {
            // Another controller is serving; leave the stack alone.
            self.state = ServiceState::Running;
            return Ok(false);
        }

        if !status.installed {
            return Err(ServerError::NotInstalled);
        }

        // Health is the bar for Running; containers that are up but not
        // answering still go through the start cycle.
        self.state = ServiceState::Stopped;
        self.transition(ServiceState::Starting)?;

        if status.containers_exist && !status.containers_running {
            tracing::info!("starting existing backend containers");
            self.runtime
                .compose(&self.config.install_dir, &["start"])
                .await?;
        } else {
            tracing::info!("bringing the backend stack up");
            self.runtime
                .compose(&self.config.install_dir, &["up", "-d"])
                .await?;
        }

        tracing::info!("waiting for the backend to become ready");
        if !self
            .wait_ready(Duration::from_secs(self.config.readiness_timeout_secs))
            .await
        {
            self.transition(ServiceState::Stopped)?;
            return Err(ServerError::ReadinessTimeout(
                self.config.readiness_timeout_secs,
            ));
        }

        self.transition(ServiceState::Running)?;
        Ok(true)
    }

    /// Applies a guarded state transition
    fn transition(&mut self, next: ServiceState) -> ServerResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ServerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("service state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    /// Re-derives state from probes; external controllers may have
    /// moved the stack since we last looked
    async fn refresh_state(&mut self) {
        self.state = if !self.is_installed() {
            ServiceState::NotInstalled
        } else {
            let containers = self.probe_containers().await;
            if containers.exists && containers.running {
                ServiceState::Running
            } else {
                ServiceState::Stopped
            }
        };
    }

    async fn probe_containers(&self) -> ContainerStatus {
        if !self.config.install_dir.exists() {
            return ContainerStatus {
                exists: false,
                running: false,
            };
        }
        match self
            .runtime
            .compose(&self.config.install_dir, &["ps", "--format", "{{.State}}"])
            .await
        {
            Ok(output) => parse_container_states(&output),
            Err(_) => ContainerStatus {
                exists: false,
                running: false,
            },
        }
    }

    /// Writes the generated `.env` and removes the upstream override file
    async fn write_config_files(&self) -> ServerResult<()> {
        let auth_key: String = std::iter::repeat_with(fastrand::alphanumeric)
            .take(AUTH_KEY_LEN)
            .collect();
        let mut env_content = render_env_file(&self.config, &auth_key);

        // Compose warns for every ${VAR} the env file leaves undefined.
        let compose_file = self.config.install_dir.join("docker-compose.yaml");
        if let Ok(compose_text) = tokio::fs::read_to_string(&compose_file).await {
            env_content = append_missing_env_vars(env_content, &compose_text);
        }

        let env_path = self.config.install_dir.join(".env");
        tokio::fs::write(&env_path, env_content).await?;
        tracing::debug!("wrote {}", env_path.display());

        // Compose merges override files by appending list entries, which
        // would publish the API port a second time on all interfaces.
        let override_file = self.config.install_dir.join("docker-compose.override.yml");
        if override_file.exists() {
            match tokio::fs::remove_file(&override_file).await {
                Ok(()) => tracing::debug!("removed {}", override_file.display()),
                Err(e) => {
                    tracing::warn!("could not remove {}: {}", override_file.display(), e)
                }
            }
        }
        Ok(())
    }
}

/// Renders the generated `.env` for the backend checkout
///
/// The upstream compose file publishes `"${PORT:-3002}:${INTERNAL_PORT:-3002}"`;
/// folding the host address into PORT binds the API to localhost without
/// needing an override file.
fn render_env_file(config: &ServerConfig, auth_key: &str) -> String {
    format!(
        "\
# Backend configuration (managed by marksmith)
PORT={host}:{port}
INTERNAL_PORT={port}
HOST=0.0.0.0
USE_DB_AUTHENTICATION=false
BULL_AUTH_KEY={auth_key}
NUM_WORKERS_PER_QUEUE={workers}

# Optional vars referenced by the upstream compose file, empty to keep it quiet
PROXY_SERVER=
PROXY_USERNAME=
PROXY_PASSWORD=
BLOCK_MEDIA=
OPENAI_API_KEY=
OPENAI_BASE_URL=
MODEL_NAME=
MODEL_EMBEDDING_NAME=
OLLAMA_BASE_URL=
TEST_API_KEY=
SUPABASE_ANON_TOKEN=
SUPABASE_URL=
SUPABASE_SERVICE_TOKEN=
SELF_HOSTED_WEBHOOK_URL=
LOGGING_LEVEL=
SEARXNG_ENDPOINT=
SEARXNG_ENGINES=
SEARXNG_CATEGORIES=
SLACK_WEBHOOK_URL=
",
        host = config.api_host,
        port = config.api_port,
        auth_key = auth_key,
        workers = config.workers,
    )
}

/// Collects `${VAR}` names referenced in a compose file
///
/// Handles the `${VAR}`, `${VAR:-default}`, and `${VAR-default}` forms.
fn extract_compose_vars(compose_text: &str) -> std::collections::BTreeSet<String> {
    let mut vars = std::collections::BTreeSet::new();
    let mut rest = compose_text;
    while let Some(pos) = rest.find("${") {
        rest = &rest[pos + 2..];
        let name: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        let starts_well = name
            .chars()
            .next()
            .map_or(false, |c| c.is_ascii_alphabetic() || c == '_');
        if starts_well {
            vars.insert(name);
        }
    }
    vars
}

/// Appends `VAR=` lines for compose variables the env content misses
fn append_missing_env_vars(env_content: String, compose_text: &str) -> String {
    let existing: std::collections::HashSet<&str> = env_content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            line.split_once('=').map(|(key, _)| key.trim())
        })
        .collect();

    let missing: Vec<String> = extract_compose_vars(compose_text)
        .into_iter()
        .filter(|var| !existing.contains(var.as_str()))
        .collect();
    if missing.is_empty() {
        return env_content;
    }

    let mut out = env_content.trim_end().to_string();
    out.push_str("\n\n# Defined empty to silence compose warnings about unset variables\n");
    for var in missing {
        out.push_str(&var);
        out.push_str("=\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Scripted runtime: records every call, answers `ps` from a canned
    /// string, and fabricates a checkout on `clone_repo`
    struct FakeRuntime {
        ps_output: String,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRuntime {
        fn new(ps_output: &str) -> Self {
            FakeRuntime {
                ps_output: ps_output.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        async fn compose(&self, _dir: &Path, args: &[&str]) -> ServerResult<String> {
            self.calls.lock().unwrap().push(args.join(" "));
            if args.first() == Some(&"ps") {
                return Ok(self.ps_output.clone());
            }
            Ok(String::new())
        }

        async fn compose_streaming(&self, _dir: &Path, args: &[&str]) -> ServerResult<()> {
            self.calls.lock().unwrap().push(args.join(" "));
            Ok(())
        }

        async fn docker_available(&self) -> bool {
            true
        }

        async fn clone_repo(&self, _repo_url: &str, dest: &Path) -> ServerResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("clone {}", dest.display()));
            std::fs::create_dir_all(dest)?;
            std::fs::write(
                dest.join("docker-compose.yaml"),
                "ports:\n  - \"${PORT:-3002}:${INTERNAL_PORT:-3002}\"\n  - \"${EXTRA_VAR}\"\n",
            )?;
            std::fs::write(dest.join("docker-compose.override.yml"), "services: {}\n")?;
            Ok(())
        }
    }

    fn server_config(install_dir: &Path) -> ServerConfig {
        ServerConfig {
            install_dir: install_dir.to_path_buf(),
            ..ServerConfig::default()
        }
    }

    fn backend_client(api_url: &str) -> Arc<BackendClient> {
        let config = BackendConfig {
            api_url: api_url.to_string(),
            ..BackendConfig::default()
        };
        Arc::new(BackendClient::new(&config).unwrap())
    }

    /// Marks a directory as an installed checkout
    fn fake_install(dir: &Path) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(".env"), "PORT=127.0.0.1:3002\n").unwrap();
    }

    async fn mount_health(server: &MockServer, status: u16) {
        Mock::given(method("GET"))
            .and(path("/v0/health/liveness"))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_ensure_returns_false_when_already_healthy() {
        let server = MockServer::start().await;
        mount_health(&server, 200).await;

        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");
        fake_install(&install_dir);

        let runtime = FakeRuntime::new("running\n");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        let started = manager.ensure(false).await.unwrap();
        assert!(!started, "a healthy stack must not be claimed");
        assert_eq!(manager.state(), ServiceState::Running);
    }

    #[tokio::test]
    async fn test_ensure_fails_when_not_installed() {
        let server = MockServer::start().await;
        mount_health(&server, 503).await;

        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("missing");

        let runtime = FakeRuntime::new("");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        let result = manager.ensure(false).await;
        assert!(matches!(result, Err(ServerError::NotInstalled)));
    }

    #[tokio::test]
    async fn test_ensure_starts_stopped_containers() {
        let server = MockServer::start().await;
        // First probe fails, the post-start poll succeeds.
        Mock::given(method("GET"))
            .and(path("/v0/health/liveness"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_health(&server, 200).await;

        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");
        fake_install(&install_dir);

        let runtime = FakeRuntime::new("exited\nexited\n");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        let started = manager.ensure(false).await.unwrap();
        assert!(started);
        assert_eq!(manager.state(), ServiceState::Running);
        let calls = manager.runtime.calls();
        assert!(
            calls.contains(&"start".to_string()),
            "stopped containers get compose start, not up: {:?}",
            calls
        );
        assert!(!calls.contains(&"up -d".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_brings_up_fresh_stack() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v0/health/liveness"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_health(&server, 200).await;

        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");
        fake_install(&install_dir);

        let runtime = FakeRuntime::new("");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        let started = manager.ensure(false).await.unwrap();
        assert!(started);
        assert!(manager.runtime.calls().contains(&"up -d".to_string()));
    }

    #[tokio::test]
    async fn test_ensure_times_out_when_backend_never_answers() {
        let server = MockServer::start().await;
        mount_health(&server, 503).await;

        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");
        fake_install(&install_dir);

        let mut config = server_config(&install_dir);
        config.readiness_timeout_secs = 0;

        let runtime = FakeRuntime::new("");
        let mut manager =
            ServiceManager::with_runtime(config, backend_client(&server.uri()), runtime).await;

        let result = manager.ensure(false).await;
        assert!(matches!(result, Err(ServerError::ReadinessTimeout(0))));
        assert_eq!(manager.state(), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_ensure_force_start_claims_healthy_stack() {
        let server = MockServer::start().await;
        mount_health(&server, 200).await;

        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");
        fake_install(&install_dir);

        let runtime = FakeRuntime::new("running\n");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        let started = manager.ensure(true).await.unwrap();
        assert!(started, "force start must claim ownership even when warm");
        assert!(manager.runtime.calls().contains(&"up -d".to_string()));
    }

    #[tokio::test]
    async fn test_stop_without_install_is_a_no_op() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("missing");

        let runtime = FakeRuntime::new("");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        manager.stop().await.unwrap();
        assert!(manager.runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn test_install_clones_and_writes_env() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");

        let runtime = FakeRuntime::new("");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        manager.install(false).await.unwrap();

        let env_content = std::fs::read_to_string(install_dir.join(".env")).unwrap();
        assert!(env_content.contains("PORT=127.0.0.1:3002"));
        assert!(env_content.contains("NUM_WORKERS_PER_QUEUE=2"));
        assert!(env_content.contains("BULL_AUTH_KEY="));
        // The fake compose file references EXTRA_VAR, so it gets defined.
        assert!(env_content.contains("EXTRA_VAR=\n"));
        assert!(
            !install_dir.join("docker-compose.override.yml").exists(),
            "override file must be removed after install"
        );
        assert_eq!(manager.state(), ServiceState::Stopped);
    }

    #[tokio::test]
    async fn test_install_twice_does_not_reclone() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");

        let runtime = FakeRuntime::new("");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        manager.install(false).await.unwrap();
        manager.install(false).await.unwrap();

        let clones = manager
            .runtime
            .calls()
            .iter()
            .filter(|c| c.starts_with("clone"))
            .count();
        assert_eq!(clones, 1, "second install must only rewrite config");
    }

    #[tokio::test]
    async fn test_install_force_reclones() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let install_dir = dir.path().join("firecrawl");

        let runtime = FakeRuntime::new("");
        let mut manager = ServiceManager::with_runtime(
            server_config(&install_dir),
            backend_client(&server.uri()),
            runtime,
        )
        .await;

        manager.install(false).await.unwrap();
        manager.install(true).await.unwrap();

        let clones = manager
            .runtime
            .calls()
            .iter()
            .filter(|c| c.starts_with("clone"))
            .count();
        assert_eq!(clones, 2);
    }

    #[test]
    fn test_render_env_file_defaults() {
        let config = ServerConfig::default();
        let content = render_env_file(&config, "test-key");

        assert!(content.contains("PORT=127.0.0.1:3002"));
        assert!(content.contains("INTERNAL_PORT=3002"));
        assert!(content.contains("HOST=0.0.0.0"));
        assert!(content.contains("USE_DB_AUTHENTICATION=false"));
        assert!(content.contains("BULL_AUTH_KEY=test-key"));
        assert!(content.contains("NUM_WORKERS_PER_QUEUE=2"));
        assert!(content.contains("PROXY_SERVER=\n"));
    }

    #[test]
    fn test_extract_compose_vars_forms() {
        let text = "a: ${PLAIN}\nb: ${WITH_DEFAULT:-3002}\nc: ${DASH_DEFAULT-x}\nd: ${1BAD}\n";
        let vars = extract_compose_vars(text);

        assert!(vars.contains("PLAIN"));
        assert!(vars.contains("WITH_DEFAULT"));
        assert!(vars.contains("DASH_DEFAULT"));
        assert!(!vars.iter().any(|v| v.contains("BAD")));
    }

    #[test]
    fn test_append_missing_env_vars_skips_defined() {
        let env = "PORT=127.0.0.1:3002\nHOST=0.0.0.0\n".to_string();
        let compose = "ports:\n  - \"${PORT:-3002}\"\nextra: ${NEW_VAR}\n";

        let out = append_missing_env_vars(env, compose);
        assert!(out.contains("NEW_VAR=\n"));
        assert_eq!(out.matches("PORT=").count(), 1, "already-defined keys are not re-appended");
    }

    #[test]
    fn test_append_missing_env_vars_no_change_when_covered() {
        let env = "PORT=1\nHOST=2\n".to_string();
        let compose = "a: ${PORT}\nb: ${HOST}\n";

        let out = append_missing_env_vars(env.clone(), compose);
        assert_eq!(out, env);
    }
}
