//! Harvest coordinator - run orchestration
//!
//! This module ties the pipeline together:
//! - Discovering the catalog on the index page
//! - Dispatching one fetch per entry to the worker pool
//! - Waiting for every fetch, then writing results in catalog order
//! - Producing the run summary
//!
//! Runs can be driven directly with [`Harvester::run`] or started in the
//! background with [`spawn_run`], which returns a cancellable [`RunHandle`].

use crate::config::Config;
use crate::crawler::catalog::discover;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::ExtractionRules;
use crate::crawler::retry::{fetch_with_retry, Retried, RetryFailure, RetryPolicy};
use crate::crawler::scheduler::WorkerPool;
use crate::output::{OutputSink, PageFailure, RunSummary, TextFileSink};
use crate::state::{CatalogEntry, FetchOutcome, RunState};
use crate::storage::ResultStore;
use crate::url::{extract_domain, parse_index_url};
use crate::{FetchError, HarvestError, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{AbortHandle, JoinHandle};

/// Runs harvests with one fixed configuration
///
/// A harvester holds no per-run state; the worker pool, the result store and
/// the state machine are created fresh by each call to [`Harvester::run`].
#[derive(Debug)]
pub struct Harvester {
    fetcher: Arc<PageFetcher>,
    rules: Arc<ExtractionRules>,
    policy: RetryPolicy,
    concurrency_limit: usize,
    output_file_name: String,
}

impl Harvester {
    /// Creates a harvester from a configuration
    ///
    /// The configuration is validated first, so a harvester always has a
    /// usable encoding and compiled selectors.
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError)` - Invalid configuration or HTTP client setup failed
    pub fn new(config: &Config) -> Result<Self> {
        crate::config::validate(config)?;

        Ok(Self {
            fetcher: Arc::new(PageFetcher::new(&config.fetch)?),
            rules: Arc::new(ExtractionRules::from_config(&config.pipeline)?),
            policy: RetryPolicy::from(&config.retry),
            concurrency_limit: config.pipeline.concurrency_limit,
            output_file_name: config.pipeline.output_file_name.clone(),
        })
    }

    /// Maximum number of detail pages fetched at once
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Lists the catalog of an index page without fetching any detail page
    pub async fn discover(&self, index_url: &str) -> Result<Vec<CatalogEntry>> {
        let index_url = parse_index_url(index_url)?;
        discover(&self.fetcher, &index_url, &self.rules)
            .await
            .map_err(HarvestError::Discovery)
    }

    /// Runs a complete harvest into `sink`
    ///
    /// The index page is fetched once; if that fails the run fails with
    /// [`HarvestError::Discovery`]. Every detail page is then fetched under
    /// the concurrency limit with retries. Pages that never produce content
    /// are listed in the summary and contribute nothing to the sink.
    ///
    /// # Arguments
    ///
    /// * `index_url` - The page listing the catalog
    /// * `sink` - Receives each successful page's text in catalog order
    pub async fn run(&self, index_url: &str, sink: &mut dyn OutputSink) -> Result<RunSummary> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let index_url = parse_index_url(index_url)?;
        let mut progress = RunProgress::new();

        tracing::info!(
            "Starting harvest of {} (host {}, concurrency {})",
            index_url,
            extract_domain(&index_url).unwrap_or_default(),
            self.concurrency_limit
        );

        let entries = match discover(&self.fetcher, &index_url, &self.rules).await {
            Ok(entries) => entries,
            Err(e) => {
                progress.advance(RunState::Failed)?;
                tracing::error!("Failed to visit index page {}: {}", index_url, e);
                return Err(HarvestError::Discovery(e));
            }
        };

        progress.advance(RunState::Fetching)?;
        let pool = WorkerPool::new(self.concurrency_limit);
        let store = Arc::new(ResultStore::with_capacity(entries.len()));
        let report = pool
            .run_all(&entries, &store, |entry| {
                let fetcher = Arc::clone(&self.fetcher);
                let rules = Arc::clone(&self.rules);
                let policy = self.policy.clone();
                async move { harvest_page(&fetcher, &rules, &policy, entry).await }
            })
            .await;
        if report.panicked > 0 {
            tracing::warn!("{} fetch tasks panicked", report.panicked);
        }

        progress.advance(RunState::Aggregating)?;
        let outcomes = store.drain_in_order(entries.len());
        let (succeeded_count, failures) = match emit(&entries, outcomes, sink) {
            Ok(counts) => counts,
            Err(e) => {
                progress.advance(RunState::Failed)?;
                tracing::error!("Failed to write output: {}", e);
                return Err(HarvestError::Sink(e));
            }
        };

        progress.advance(RunState::Done)?;
        let summary = RunSummary {
            index_url: index_url.to_string(),
            started_at,
            entry_count: entries.len(),
            succeeded_count,
            failures,
            elapsed: start_time.elapsed(),
            output_path: sink.location().map(Path::to_path_buf),
        };

        tracing::info!(
            "Harvest completed: {}/{} pages in {:?}",
            summary.succeeded_count,
            summary.entry_count,
            summary.elapsed
        );

        Ok(summary)
    }

    /// Runs a harvest into `<output_dir>/<output-file-name>`
    ///
    /// An existing output file is replaced only when the run completes; a
    /// failed or cancelled run leaves it as it was.
    pub async fn run_to_dir(&self, index_url: &str, output_dir: &Path) -> Result<RunSummary> {
        let mut sink = TextFileSink::new(output_dir.join(&self.output_file_name));
        self.run(index_url, &mut sink).await
    }
}

/// Tracks the run state machine and rejects illegal transitions
#[derive(Debug)]
struct RunProgress {
    state: RunState,
}

impl RunProgress {
    fn new() -> Self {
        Self {
            state: RunState::Discovering,
        }
    }

    fn advance(&mut self, next: RunState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Run state {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Fetches one detail page with retries and extracts its text
async fn harvest_page(
    fetcher: &PageFetcher,
    rules: &ExtractionRules,
    policy: &RetryPolicy,
    entry: CatalogEntry,
) -> FetchOutcome {
    let start_time = Instant::now();
    tracing::debug!("Fetching #{} {}", entry.position, entry.source_url);

    let outcome = match fetch_with_retry(fetcher, &entry.source_url, policy).await {
        Ok(Retried {
            value: html,
            attempts,
        }) => match rules.extract_content(&html) {
            Some(text) => FetchOutcome::success(&entry, text, attempts),
            None => {
                let error = FetchError::MissingContent {
                    url: entry.source_url.to_string(),
                    selector: rules.content_selector().to_string(),
                };
                tracing::warn!("{}", error);
                FetchOutcome::failure(&entry, error, attempts)
            }
        },
        Err(RetryFailure { error, attempts }) => FetchOutcome::failure(&entry, error, attempts),
    };

    tracing::debug!(
        "Finished #{} {} in {:?}",
        entry.position,
        entry.source_url,
        start_time.elapsed()
    );
    outcome
}

/// Writes successful outcomes to the sink and collects the failures
///
/// `outcomes` must be in catalog order. An entry with no outcome, left behind
/// by a fetch task that never finished, is reported as
/// [`FetchError::Incomplete`] with zero attempts.
fn emit(
    entries: &[CatalogEntry],
    outcomes: Vec<FetchOutcome>,
    sink: &mut dyn OutputSink,
) -> std::io::Result<(usize, Vec<PageFailure>)> {
    let mut succeeded = 0;
    let mut failures = Vec::new();
    let mut outcomes = outcomes.into_iter().peekable();

    for entry in entries {
        let outcome = match outcomes.next_if(|o| o.position == entry.position) {
            Some(outcome) => outcome,
            None => {
                let url = entry.source_url.to_string();
                failures.push(PageFailure {
                    position: entry.position,
                    url: url.clone(),
                    attempts: 0,
                    error: FetchError::Incomplete { url },
                });
                continue;
            }
        };

        if outcome.succeeded {
            sink.write_entry(&outcome.text)?;
            succeeded += 1;
        } else {
            let url = outcome.source_url.to_string();
            let error = outcome
                .last_error
                .unwrap_or_else(|| FetchError::Incomplete { url: url.clone() });
            failures.push(PageFailure {
                position: outcome.position,
                url,
                attempts: outcome.attempts,
                error,
            });
        }
    }
    sink.finish()?;

    Ok((succeeded, failures))
}

/// Handle to a run started with [`spawn_run`]
#[derive(Debug)]
pub struct RunHandle {
    task: JoinHandle<Result<RunSummary>>,
}

impl RunHandle {
    /// Aborts the run and every fetch still in flight
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// Returns a canceller that can be moved to another task
    pub fn canceller(&self) -> RunCanceller {
        RunCanceller(self.task.abort_handle())
    }

    /// Returns true once the run has finished, failed or been cancelled
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the run to end
    ///
    /// Returns [`HarvestError::Cancelled`] if the run was cancelled first.
    pub async fn wait(self) -> Result<RunSummary> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(HarvestError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

/// Cancels a spawned run from anywhere
#[derive(Debug, Clone)]
pub struct RunCanceller(AbortHandle);

impl RunCanceller {
    pub fn cancel(&self) {
        self.0.abort();
    }
}

/// Starts a harvest into `<output_dir>/<output-file-name>` on the runtime
///
/// Must be called from within a tokio runtime.
pub fn spawn_run(
    harvester: Arc<Harvester>,
    index_url: impl Into<String>,
    output_dir: impl Into<PathBuf>,
) -> RunHandle {
    let index_url = index_url.into();
    let output_dir = output_dir.into();

    let task = tokio::spawn(async move { harvester.run_to_dir(&index_url, &output_dir).await });

    RunHandle { task }
}
