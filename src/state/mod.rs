//! State module for tracking harvest progress
//!
//! # Components
//!
//! - `RunState`: the orchestrator's phase (discovering, fetching, aggregating, ...)
//! - `CatalogEntry`: one discovered link with its catalog position
//! - `FetchOutcome`: the result of fetching one catalog entry

mod entry;
mod run_state;

// Re-export main types
pub use entry::{CatalogEntry, FetchOutcome};
pub use run_state::RunState;
