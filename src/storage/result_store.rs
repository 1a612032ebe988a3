//! Position-indexed outcome store
//!
//! Workers write into the store concurrently, each under its own position;
//! the orchestrator drains it once every worker has finished.

use crate::state::FetchOutcome;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Shared map from catalog position to fetch outcome
///
/// The mutex guards a single insert at a time and is never held across an
/// await point.
#[derive(Debug, Default)]
pub struct ResultStore {
    outcomes: Mutex<HashMap<usize, FetchOutcome>>,
}

impl ResultStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for `capacity` outcomes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Records the outcome for a position
    ///
    /// Each position is written once per run. A second write for the same
    /// position replaces the first.
    pub fn set(&self, position: usize, outcome: FetchOutcome) {
        let previous = self.lock().insert(position, outcome);
        if previous.is_some() {
            tracing::warn!("Outcome for position {} was written twice", position);
        }
    }

    /// Removes and returns outcomes for positions `0..count` in ascending order
    ///
    /// Positions that were never written are skipped rather than treated as
    /// errors.
    pub fn drain_in_order(&self, count: usize) -> Vec<FetchOutcome> {
        let mut outcomes = self.lock();
        (0..count)
            .filter_map(|position| outcomes.remove(&position))
            .collect()
    }

    /// Returns the number of positions written so far
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns whether a position has been written
    pub fn contains(&self, position: usize) -> bool {
        self.lock().contains_key(&position)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, FetchOutcome>> {
        // A panicking writer cannot leave a half-done insert behind
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
