//! Container runtime seam and the docker compose implementation
//!
//! All interaction with the container stack goes through the
//! `ContainerRuntime` trait so the lifecycle manager can be driven by a
//! scripted runtime in tests. The real implementation shells out to
//! `docker compose` with the stack checkout as its working directory.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

use crate::state::ServiceState;

/// Errors from the backing service lifecycle
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Docker not found. Install Docker and make sure it is on PATH")]
    DockerNotFound,

    #[error("Git not found. Install git and make sure it is on PATH")]
    GitNotFound,

    #[error("docker compose {args} failed: {stderr}")]
    ComposeFailed { args: String, stderr: String },

    #[error("git clone failed: {0}")]
    CloneFailed(String),

    #[error("Backend service is not installed. Run `marksmith server install` first")]
    NotInstalled,

    #[error("Backend did not become ready within {0}s. Check `marksmith server logs`")]
    ReadinessTimeout(u64),

    #[error("Invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: ServiceState,
        to: ServiceState,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ServerResult<T> = std::result::Result<T, ServerError>;

/// Live container-stack facts derived from a `compose ps` probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerStatus {
    /// At least one container for the stack exists (running or not)
    pub exists: bool,

    /// Every container of the stack is in the `running` state
    pub running: bool,
}

/// Seam over the container runtime
///
/// The stack directory is passed per call; implementations hold no state
/// about the stack, which stays true to the rule that this engine is not
/// the only controller of it.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runs `docker compose <args>` in `dir`, capturing stdout
    async fn compose(&self, dir: &Path, args: &[&str]) -> ServerResult<String>;

    /// Runs `docker compose <args>` in `dir` with inherited stdio, for
    /// streaming output such as `logs --follow`
    async fn compose_streaming(&self, dir: &Path, args: &[&str]) -> ServerResult<()>;

    /// Returns true when the docker daemon answers `docker info`
    async fn docker_available(&self) -> bool;

    /// Shallow-clones `repo_url` into `dest`
    async fn clone_repo(&self, repo_url: &str, dest: &Path) -> ServerResult<()>;
}

/// The real runtime: `docker compose` subprocesses
pub struct DockerCompose;

impl DockerCompose {
    fn base_command(dir: &Path) -> Command {
        let mut cmd = Command::new("docker");
        cmd.arg("compose");
        // The generated .env must reach compose even when invoked from
        // another working directory
        let env_file = dir.join(".env");
        if env_file.exists() {
            cmd.arg("--env-file").arg(&env_file);
        }
        cmd.current_dir(dir);
        cmd
    }

    fn map_spawn_error(e: std::io::Error) -> ServerError {
        if e.kind() == std::io::ErrorKind::NotFound {
            ServerError::DockerNotFound
        } else {
            ServerError::Io(e)
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerCompose {
    async fn compose(&self, dir: &Path, args: &[&str]) -> ServerResult<String> {
        let output = Self::base_command(dir)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(Self::map_spawn_error)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ServerError::ComposeFailed {
                args: args.join(" "),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn compose_streaming(&self, dir: &Path, args: &[&str]) -> ServerResult<()> {
        let status = Self::base_command(dir)
            .args(args)
            .status()
            .await
            .map_err(Self::map_spawn_error)?;

        if !status.success() {
            return Err(ServerError::ComposeFailed {
                args: args.join(" "),
                stderr: format!("exited with {}", status),
            });
        }
        Ok(())
    }

    async fn docker_available(&self) -> bool {
        let result = Command::new("docker")
            .arg("info")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        matches!(result, Ok(status) if status.success())
    }

    async fn clone_repo(&self, repo_url: &str, dest: &Path) -> ServerResult<()> {
        let output = Command::new("git")
            .args(["clone", "--depth", "1", repo_url])
            .arg(dest)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ServerError::GitNotFound
                } else {
                    ServerError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ServerError::CloneFailed(stderr));
        }
        Ok(())
    }
}

/// Parses `docker compose ps --format {{.State}}` output
///
/// No lines means no containers exist; the stack counts as running only
/// when every line reports `running`.
pub fn parse_container_states(output: &str) -> ContainerStatus {
    let states: Vec<&str> = output
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect();

    if states.is_empty() {
        return ContainerStatus {
            exists: false,
            running: false,
        };
    }

    ContainerStatus {
        exists: true,
        running: states.iter().all(|s| *s == "running"),
    }
}

/// Runs a version-style probe command and returns its first output line
///
/// None when the binary is missing or the command fails; used by the
/// doctor to report what is installed.
pub async fn probe_version(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
}
