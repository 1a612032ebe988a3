//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building HTTP clients with the fixed request header set
//! - Per-request user-agent rotation and politeness delay
//! - GET requests with a hard timeout
//! - Error classification
//! - Decoding bodies from the configured source encoding
//!
//! Retrying is not done here; see the `retry` module.

use crate::config::FetchConfig;
use crate::{ConfigError, FetchError, HarvestError};
use encoding_rs::Encoding;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Browser user agents rotated through when randomization is on
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Raw response of a successful GET
#[derive(Debug, Clone)]
pub struct RawPage {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code (always 2xx)
    pub status: u16,
    /// Undecoded body
    pub bytes: Vec<u8>,
}

/// Issues single GET requests and decodes their bodies
///
/// One fetcher is built per run and shared by every worker.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    encoding: &'static Encoding,
    randomize_user_agent: bool,
    per_domain_delay: Duration,
    lossy_decoding: bool,
}

impl PageFetcher {
    /// Creates a fetcher from the fetch configuration
    ///
    /// # Returns
    ///
    /// * `Ok(PageFetcher)` - Ready to issue requests
    /// * `Err(HarvestError)` - Unknown encoding, bad header, or client build failure
    pub fn new(config: &FetchConfig) -> Result<Self, HarvestError> {
        let encoding = lookup_encoding(&config.source_encoding)?;
        let client = build_http_client(config)?;

        Ok(Self {
            client,
            encoding,
            randomize_user_agent: config.randomize_user_agent,
            per_domain_delay: config.per_domain_delay(),
            lossy_decoding: config.lossy_decoding,
        })
    }

    /// The encoding bodies are decoded from
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Fetches a URL once
    ///
    /// Waits out the politeness delay, sends the GET, and reads the whole
    /// body. Any non-2xx status is an error.
    pub async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError> {
        let delay = politeness_delay(self.per_domain_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut request = self.client.get(url.as_str());
        if self.randomize_user_agent {
            request = request.header(USER_AGENT, random_user_agent());
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, &e))?;

        tracing::trace!("Fetched {} bytes from {}", bytes.len(), final_url);

        Ok(RawPage {
            url: final_url,
            status: status.as_u16(),
            bytes: bytes.to_vec(),
        })
    }

    /// Fetches a URL once and decodes the body to text
    pub async fn fetch_text(&self, url: &Url) -> Result<String, FetchError> {
        let page = self.fetch(url).await?;
        self.decode_page(&page)
    }

    /// Decodes a fetched page with this fetcher's encoding settings
    pub fn decode_page(&self, page: &RawPage) -> Result<String, FetchError> {
        decode(page, self.encoding, self.lossy_decoding)
    }
}

/// Builds an HTTP client with the fixed header set
///
/// The fixed headers (`Connection`, `Content-Type`, `Accept-Language`) go
/// first; configured headers are applied on top and may override them.
/// When user-agent randomization is off, the client identifies itself as
/// `catalog-harvest/<version>`.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            ConfigError::Validation(format!("Invalid header name '{}'", name))
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| {
            ConfigError::Validation(format!("Invalid value for header '{}'", name))
        })?;
        headers.insert(name, value);
    }

    let client = Client::builder()
        .user_agent(concat!("catalog-harvest/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Resolves an encoding label such as `gbk` or `utf-8`
pub fn lookup_encoding(label: &str) -> Result<&'static Encoding, ConfigError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))
}

/// Decodes a page body from the source encoding
///
/// No detection is attempted: BOMs and `<meta charset>` are ignored and the
/// configured encoding always wins. In strict mode any malformed sequence
/// fails the page; in lossy mode it becomes U+FFFD.
pub fn decode(
    page: &RawPage,
    encoding: &'static Encoding,
    lossy: bool,
) -> Result<String, FetchError> {
    if lossy {
        let (text, had_errors) = encoding.decode_without_bom_handling(&page.bytes);
        if had_errors {
            tracing::debug!(
                "Replaced malformed {} sequences in {}",
                encoding.name(),
                page.url
            );
        }
        return Ok(text.into_owned());
    }

    encoding
        .decode_without_bom_handling_and_without_replacement(&page.bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| FetchError::Decode {
            url: page.url.to_string(),
            encoding: encoding.name().to_string(),
        })
}

/// Picks one of the built-in browser user agents
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Random delay in `[0, max)`; zero when `max` is zero
fn politeness_delay(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

/// Maps a transport error onto the page error taxonomy
fn classify_error(url: &Url, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else if error.is_connect() {
        FetchError::Network {
            url: url.to_string(),
            message: format!("connection failed: {}", error),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
