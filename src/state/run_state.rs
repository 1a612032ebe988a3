/// Run state definitions for the harvest pipeline
///
/// A run moves strictly forward through these states. Only discovery and
/// output emission can fail the run as a whole.
use std::fmt;

/// Represents the current phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    /// Fetching the index page and extracting catalog entries
    Discovering,

    /// Detail pages are being fetched by the worker pool
    Fetching,

    /// All fetches finished; outcomes are being written in catalog order
    Aggregating,

    // ===== Terminal States =====
    /// Output written and summary produced
    Done,

    /// Run aborted (index page unavailable or output sink failed)
    Failed,
}

impl RunState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state
    ///
    /// Page failures during `Fetching` never fail the run, so `Fetching`
    /// has no edge into `Failed`.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Discovering, Self::Fetching)
                | (Self::Discovering, Self::Failed)
                | (Self::Fetching, Self::Aggregating)
                | (Self::Aggregating, Self::Done)
                | (Self::Aggregating, Self::Failed)
        )
    }

    /// Short lowercase name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovering => "discovering",
            Self::Fetching => "fetching",
            Self::Aggregating => "aggregating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible run states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Discovering,
            Self::Fetching,
            Self::Aggregating,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
