//! Catalog-Harvest: an ordered catalog fetcher
//!
//! This crate discovers the detail pages linked from a single index page,
//! fetches them concurrently under a fixed cap with retry and backoff,
//! decodes their text from a configured legacy encoding, and writes the
//! results back out in the original catalog order.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Run-level error type for Catalog-Harvest operations
///
/// Only failures that abort a whole run end up here. Per-page failures are
/// recorded as [`FetchError`]s inside the run summary instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to discover catalog: {0}")]
    Discovery(#[source] FetchError),

    #[error("Failed to write output: {0}")]
    Sink(#[source] std::io::Error),

    #[error("Invalid index URL '{url}': {message}")]
    InvalidIndexUrl { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("Run was cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-page fetch errors
///
/// These are cloned into the outcome of the page that produced them, so they
/// carry messages rather than the underlying transport errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Failed to decode {url} as {encoding}")]
    Decode { url: String, encoding: String },

    #[error("No element matching '{selector}' on {url}")]
    MissingContent { url: String, selector: String },

    #[error("Fetch task for {url} did not complete")]
    Incomplete { url: String },
}

impl FetchError {
    /// Returns the URL the error refers to
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Http { url, .. }
            | Self::Timeout { url }
            | Self::Decode { url, .. }
            | Self::MissingContent { url, .. }
            | Self::Incomplete { url } => url,
        }
    }

    /// Returns true for HTTP 4xx responses that will not change on retry
    ///
    /// 408 (Request Timeout) and 429 (Too Many Requests) are client-class
    /// codes that usually do clear up, so they are not counted as permanent.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Http { status, .. }
            if (400..500).contains(status) && *status != 408 && *status != 429)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Unknown character encoding: {0}")]
    UnknownEncoding(String),
}

/// Result type alias for Catalog-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{spawn_run, Harvester, RunHandle};
pub use output::{OutputSink, RunSummary};
pub use state::{CatalogEntry, FetchOutcome, RunState};
