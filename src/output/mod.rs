//! Output module for run results
//!
//! This module handles:
//! - Writing extracted text to a sink in catalog order
//! - Summarizing a run (counts, failures, timing)
//! - Formatting the end-of-run report

pub mod stats;
mod text;
mod traits;

pub use stats::{format_summary, print_summary};
pub use text::{MemorySink, TextFileSink};
pub use traits::{OutputSink, PageFailure, RunSummary};
