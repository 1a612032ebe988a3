//! Run report formatting
//!
//! Turns a [`RunSummary`] into the report printed at the end of a run.

use crate::output::traits::RunSummary;
use std::fmt::Write;

/// Formats the run report
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Harvest Summary ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Index page: {}", summary.index_url);
    let _ = writeln!(
        out,
        "  Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "  Catalog entries: {}", summary.entry_count);
    let _ = writeln!(
        out,
        "  Succeeded: {} ({:.1}%)",
        summary.succeeded_count,
        summary.success_rate()
    );
    let _ = writeln!(out, "  Failed: {}", summary.failed_count());
    let _ = writeln!(out);

    if !summary.failures.is_empty() {
        let _ = writeln!(out, "Failed Pages ({}):", summary.failures.len());
        for failure in &summary.failures {
            let _ = writeln!(
                out,
                "  #{} {} after {} attempt(s): {}",
                failure.position, failure.url, failure.attempts, failure.error
            );
        }
        let _ = writeln!(out);
    }

    out.push_str(&summary.status_message());
    out
}

/// Prints the run report to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("{}", format_summary(summary));
}
