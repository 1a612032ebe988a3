use crate::FetchError;
use url::Url;

/// One link discovered on the index page
///
/// `position` is the rank among emitted entries, so catalog items without a
/// link never leave gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub position: usize,
    pub source_url: Url,
}

impl CatalogEntry {
    pub fn new(position: usize, source_url: Url) -> Self {
        Self {
            position,
            source_url,
        }
    }
}

/// Result of the full attempt sequence for one catalog entry
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub position: usize,
    pub source_url: Url,

    /// Extracted page text; empty when the page failed
    pub text: String,

    pub succeeded: bool,

    /// Number of fetch attempts made
    pub attempts: u32,

    /// The error that ended the attempt sequence, if it failed
    pub last_error: Option<FetchError>,
}

impl FetchOutcome {
    /// Builds a successful outcome
    pub fn success(entry: &CatalogEntry, text: String, attempts: u32) -> Self {
        Self {
            position: entry.position,
            source_url: entry.source_url.clone(),
            text,
            succeeded: true,
            attempts,
            last_error: None,
        }
    }

    /// Builds a failed outcome carrying the last observed error
    pub fn failure(entry: &CatalogEntry, error: FetchError, attempts: u32) -> Self {
        Self {
            position: entry.position,
            source_url: entry.source_url.clone(),
            text: String::new(),
            succeeded: false,
            attempts,
            last_error: Some(error),
        }
    }
}
