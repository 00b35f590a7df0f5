/// Lifecycle states for the backing scrape service
///
/// This module defines the finite-state machine the lifecycle manager moves
/// through when installing, starting, and stopping the container stack.
use std::fmt;

/// Represents the current state of the backing service stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceState {
    // ===== Pre-install =====
    /// No checkout or configuration exists on disk
    NotInstalled,

    // ===== Settled States =====
    /// Installed, containers absent or not running
    Stopped,

    /// Containers up and the API answered its health probe
    Running,

    // ===== Transitional States =====
    /// Containers launching, health probe not yet green
    Starting,

    /// Stop or teardown in progress
    Stopping,
}

impl ServiceState {
    /// Returns true if the stack is mid-transition (Starting or Stopping)
    pub fn is_transitional(&self) -> bool {
        matches!(self, Self::Starting | Self::Stopping)
    }

    /// Returns true if the stack is settled (no transition in flight)
    pub fn is_settled(&self) -> bool {
        !self.is_transitional()
    }

    /// Returns true if the service is installed on disk
    pub fn is_installed(&self) -> bool {
        !matches!(self, Self::NotInstalled)
    }

    /// Returns true if the service is up and answering health probes
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Returns true if a start action is legal from this state
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns true if `next` is a legal transition from this state
    ///
    /// Self-transitions are always legal: every lifecycle action is
    /// idempotent per current state, so re-applying one is a no-op rather
    /// than an error.
    pub fn can_transition_to(&self, next: ServiceState) -> bool {
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::NotInstalled, Self::Stopped)
                | (Self::Stopped, Self::Starting)
                | (Self::Starting, Self::Running)
                | (Self::Starting, Self::Stopped)
                | (Self::Running, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }

    /// Converts the state to its display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotInstalled => "not_installed",
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        }
    }

    /// Parses a state from its display string
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_str_token(s: &str) -> Option<Self> {
        match s {
            "not_installed" => Some(Self::NotInstalled),
            "stopped" => Some(Self::Stopped),
            "starting" => Some(Self::Starting),
            "running" => Some(Self::Running),
            "stopping" => Some(Self::Stopping),
            _ => None,
        }
    }

    /// Returns all possible service states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::NotInstalled,
            Self::Stopped,
            Self::Starting,
            Self::Running,
            Self::Stopping,
        ]
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
