//! Output sink trait and run summary types
//!
//! This module defines the trait interface for output sinks and the
//! summary returned by every completed run.

use crate::FetchError;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Destination for the ordered text of a run
///
/// The orchestrator calls `write_entry` once per successful page, in catalog
/// order, then `finish` exactly once. Any error aborts the run.
pub trait OutputSink: Send {
    /// Writes one entry followed by a newline
    ///
    /// # Arguments
    ///
    /// * `text` - The extracted page text
    fn write_entry(&mut self, text: &str) -> io::Result<()>;

    /// Flushes everything written so far
    fn finish(&mut self) -> io::Result<()>;

    /// Where the output ends up, if it is a file
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// A page that produced no content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    /// Catalog position of the page
    pub position: usize,

    /// The page URL
    pub url: String,

    /// Attempts made before giving up
    pub attempts: u32,

    /// The last error seen
    pub error: FetchError,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub index_url: String,
    pub started_at: DateTime<Utc>,

    /// Entries discovered on the index page
    pub entry_count: usize,

    /// Entries whose text was written to the sink
    pub succeeded_count: usize,

    /// Pages that produced no content, in catalog order
    pub failures: Vec<PageFailure>,

    pub elapsed: Duration,

    /// Output file, when the sink writes to one
    pub output_path: Option<PathBuf>,
}

impl RunSummary {
    /// Returns the number of entries that produced no content
    pub fn failed_count(&self) -> usize {
        self.entry_count.saturating_sub(self.succeeded_count)
    }

    /// Returns true if every discovered entry produced content
    pub fn is_complete(&self) -> bool {
        self.succeeded_count == self.entry_count
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.entry_count == 0 {
            return 0.0;
        }
        (self.succeeded_count as f64 / self.entry_count as f64) * 100.0
    }

    /// Human-readable status line for the end of a run
    pub fn status_message(&self) -> String {
        let pages = format!("{}/{} pages", self.succeeded_count, self.entry_count);
        match &self.output_path {
            Some(path) => format!(
                "Finished scraping {}. Content saved to {}\nTotal execution time: {:.2?}",
                pages,
                path.display(),
                self.elapsed
            ),
            None => format!(
                "Finished scraping {}.\nTotal execution time: {:.2?}",
                pages, self.elapsed
            ),
        }
    }
}
