//! Crawler module for catalog harvesting
//!
//! This module contains the core pipeline, including:
//! - HTTP fetching and legacy-encoding decoding
//! - Retry with backoff
//! - Catalog discovery and content extraction
//! - The bounded worker pool
//! - Overall run coordination

mod catalog;
mod coordinator;
mod fetcher;
mod parser;
mod retry;
mod scheduler;

pub use catalog::{discover, entries_from_links};
pub use coordinator::{spawn_run, Harvester, RunCanceller, RunHandle};
pub use fetcher::{
    build_http_client, decode, lookup_encoding, random_user_agent, PageFetcher, RawPage,
};
pub use parser::ExtractionRules;
pub use retry::{fetch_with_retry, retry, Retried, RetryFailure, RetryPolicy};
pub use scheduler::{PoolReport, WorkerPool};
