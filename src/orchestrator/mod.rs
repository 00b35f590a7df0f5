//! Orchestrator module for marksmith
//!
//! The top-level driver for a scrape run:
//!
//! - `RunPlan` / `RunSummary`: what a run should do and how it went
//! - `ServerPolicy` / `ShutdownPolicy`: backend handling around the run
//! - `Orchestrator`: filter, dispatch, second pass, shutdown policy
//! - `run_scrape`: convenience entry point used by the CLI

mod coordinator;
mod plan;

// Re-export main types
pub use coordinator::{run_scrape, Orchestrator};
pub use plan::{RunPlan, RunSummary, ServerPolicy, ShutdownPolicy};
