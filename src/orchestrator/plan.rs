//! Run plan and summary types for a scrape invocation

use crate::config::Config;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Policy for bringing the backend up before a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ServerPolicy {
    /// Start the backend only when no healthy one is reachable
    #[default]
    Auto,

    /// Require an already-running backend and never start one
    Never,

    /// Run the start cycle even when a healthy backend is reachable
    ///
    /// A run under this policy always counts as owning the server, so
    /// the shutdown policy applies unconditionally.
    Always,
}

impl ServerPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Never => "never",
            Self::Always => "always",
        }
    }
}

impl FromStr for ServerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "never" => Ok(Self::Never),
            "always" => Ok(Self::Always),
            other => Err(format!(
                "unknown server policy '{}' (expected auto, never, or always)",
                other
            )),
        }
    }
}

impl fmt::Display for ServerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Policy for what happens to the backend after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShutdownPolicy {
    /// Stop the containers but keep them around for a fast restart
    #[default]
    Stop,

    /// Remove the containers entirely
    Down,

    /// Leave the backend running
    Keep,
}

impl ShutdownPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Down => "down",
            Self::Keep => "keep",
        }
    }
}

impl FromStr for ShutdownPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stop" => Ok(Self::Stop),
            "down" => Ok(Self::Down),
            "keep" => Ok(Self::Keep),
            other => Err(format!(
                "unknown shutdown policy '{}' (expected stop, down, or keep)",
                other
            )),
        }
    }
}

impl fmt::Display for ShutdownPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything one scrape run needs to know
///
/// Built from resolved input plus file configuration; the CLI layer then
/// overrides the flag-driven fields before handing the plan over.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// URLs to process, in input order
    pub urls: Vec<String>,

    /// Directory receiving artifacts, the manifest, and the error log
    pub out_dir: PathBuf,

    /// Re-scrape URLs the manifest already marks done
    pub overwrite: bool,

    /// Prepend a YAML front matter block to each artifact
    pub front_matter: bool,

    pub server_policy: ServerPolicy,

    pub shutdown_policy: ShutdownPolicy,

    /// Send the whole pending set through the backend's batch endpoint
    pub batch: bool,

    /// Upper bound for the random politeness delay between URLs
    pub delay: Duration,

    /// In-flight request limit; 1 selects strictly sequential dispatch
    pub concurrency: usize,

    /// Wait between the main pass and the second pass
    pub cooldown: Duration,
}

impl RunPlan {
    /// Builds a plan with the flag-driven fields at their defaults
    pub fn new(urls: Vec<String>, out_dir: PathBuf, config: &Config) -> Self {
        Self {
            urls,
            out_dir,
            overwrite: false,
            front_matter: false,
            server_policy: ServerPolicy::default(),
            shutdown_policy: ShutdownPolicy::default(),
            batch: config.run.batch,
            delay: Duration::from_secs_f64(config.run.delay_secs),
            concurrency: config.run.concurrency,
            cooldown: Duration::from_secs(config.run.cooldown_secs),
        }
    }
}

/// Counts of per-URL outcomes for one finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Artifacts written
    pub ok: usize,

    /// Permanent failures recorded in the error log
    pub permanent: usize,

    /// URLs that stayed transient through the second pass
    pub exhausted: usize,

    /// URLs skipped because the manifest already marks them done
    pub skipped: usize,

    /// True when the run was interrupted before finishing
    pub interrupted: bool,
}

impl RunSummary {
    /// URLs that ended the run in a failed state
    pub fn failed(&self) -> usize {
        self.permanent + self.exhausted
    }

    /// Process exit code for this summary
    ///
    /// 2 when every attempted URL failed, 1 when some did, 0 otherwise.
    /// Skipped URLs count as neither attempted nor failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed() > 0 && self.ok == 0 {
            2
        } else if self.failed() > 0 {
            1
        } else {
            0
        }
    }
}
