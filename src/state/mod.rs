//! State vocabularies for the scrape engine
//!
//! This module defines the two state enums the rest of the crate shares.
//!
//! # Components
//!
//! - `ServiceState`: Finite-state machine token for the backing service stack
//!   (not installed, stopped, starting, running, stopping)
//! - `ScrapeStatus`: Per-URL outcome status recorded in manifest lines
//!   (ok, error, exhausted)

mod scrape_status;
mod service_state;

// Re-export main types
pub use scrape_status::ScrapeStatus;
pub use service_state::ServiceState;
