use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Catalog-Harvest
///
/// Every section is optional; missing keys fall back to the defaults below,
/// which match the site layout the harvester was first written against.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub retry: RetryConfig,
    pub pipeline: PipelineConfig,
}

/// HTTP fetching and decoding configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Extra request headers, applied after the fixed header set
    pub headers: BTreeMap<String, String>,

    /// Encoding label the detail pages are served in (e.g. "gbk", "utf-8")
    pub source_encoding: String,

    /// Pick a random browser user agent for every request
    pub randomize_user_agent: bool,

    /// Upper bound of the random delay before each request (milliseconds)
    pub per_domain_delay_ms: u64,

    /// Hard timeout for a whole request, body included (seconds)
    pub request_timeout_secs: u64,

    /// Timeout for establishing a connection (seconds)
    pub connect_timeout_secs: u64,

    /// Replace malformed byte sequences with U+FFFD; `false` fails the page instead
    pub lossy_decoding: bool,
}

impl FetchConfig {
    pub fn per_domain_delay(&self) -> Duration {
        Duration::from_millis(self.per_domain_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            source_encoding: "gbk".to_string(),
            randomize_user_agent: true,
            per_domain_delay_ms: 2000,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            lossy_decoding: true,
        }
    }
}

/// Delay growth between retry attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Always `base`
    Constant,
    /// `attempt * base`
    Linear,
    /// `base * 2^(attempt - 1)`
    Exponential,
}

/// Retry configuration for detail-page fetches
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Total attempts per page, first one included
    pub max_attempts: u32,

    /// Base delay fed to the backoff function (milliseconds)
    pub base_delay_ms: u64,

    pub backoff: Backoff,

    /// Whether HTTP 4xx responses are retried like any other failure
    pub retry_client_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff: Backoff::Linear,
            retry_client_errors: true,
        }
    }
}

/// Pipeline shape: concurrency, extraction rules and output naming
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Maximum number of detail pages in flight at once
    pub concurrency_limit: usize,

    /// Selector for catalog items on the index page
    pub catalog_selector: String,

    /// Selector for the link inside each catalog item (first match wins)
    pub link_selector: String,

    /// Selector for the text container on each detail page
    pub content_selector: String,

    /// File name created inside the output directory
    pub output_file_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 50,
            catalog_selector: "#catalog ul li".to_string(),
            link_selector: "a".to_string(),
            content_selector: ".txtnav".to_string(),
            output_file_name: "novel.txt".to_string(),
        }
    }
}
