//! Bounded worker pool for detail-page fetches
//!
//! This module handles:
//! - Global concurrency limiting via a counting semaphore
//! - Spawning exactly one task per catalog entry
//! - Writing each task's outcome into the shared result store
//! - Waiting for every task before returning (the barrier)
//!
//! There are no long-lived workers: admission is a semaphore permit acquired
//! before each spawn, so at most `limit` tasks are ever in flight.

use crate::state::{CatalogEntry, FetchOutcome};
use crate::storage::ResultStore;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// What happened to the tasks of one `run_all` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Tasks spawned (one per entry)
    pub dispatched: usize,

    /// Tasks that panicked; their positions stay empty in the store
    pub panicked: usize,
}

/// Dispatches one task per catalog entry under a fixed concurrency cap
#[derive(Debug)]
pub struct WorkerPool {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    limit: usize,
}

impl WorkerPool {
    /// Creates a pool admitting at most `limit` tasks at once (minimum 1)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// The configured concurrency limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots not currently held by a task
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Runs `task` once per entry and stores every outcome by position
    ///
    /// Dispatch waits for a free slot before spawning the next task. The
    /// slot is an owned permit moved into the task, so it is released on
    /// every exit path, panics included. Returns only after all spawned
    /// tasks have finished. Dropping the returned future aborts every task
    /// still running.
    ///
    /// # Arguments
    ///
    /// * `entries` - Catalog entries, one task each
    /// * `store` - Where outcomes are written, keyed by `entry.position`
    /// * `task` - Produces the outcome for one entry
    pub async fn run_all<F, Fut>(
        &self,
        entries: &[CatalogEntry],
        store: &Arc<ResultStore>,
        task: F,
    ) -> PoolReport
    where
        F: Fn(CatalogEntry) -> Fut,
        Fut: Future<Output = FetchOutcome> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        let mut report = PoolReport::default();

        for entry in entries {
            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!("Worker pool semaphore closed; stopping dispatch");
                    break;
                }
            };

            let position = entry.position;
            let store = Arc::clone(store);
            let fetch = task(entry.clone());

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = fetch.await;
                store.set(position, outcome);
            });
            report.dispatched += 1;

            tracing::trace!(
                "Dispatched position {} ({} slots free)",
                position,
                self.semaphore.available_permits()
            );
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    report.panicked += 1;
                    tracing::error!("Fetch task panicked: {}", e);
                } else {
                    tracing::warn!("Fetch task did not complete: {}", e);
                }
            }
        }

        report
    }
}
