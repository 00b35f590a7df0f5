//! Local backend service management
//!
//! This module owns the dockerized scrape backend, including:
//! - The `docker compose` subprocess layer behind a runtime trait
//! - Install, start, stop, and teardown of the stack
//! - Readiness polling against the health endpoint
//! - The guarded lifecycle state machine

mod compose;
mod lifecycle;

pub use compose::{
    parse_container_states, probe_version, ContainerRuntime, ContainerStatus, DockerCompose,
    ServerError, ServerResult,
};
pub use lifecycle::{ServiceManager, ServiceStatus};
