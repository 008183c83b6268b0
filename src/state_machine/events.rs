use serde::{Deserialize, Serialize};

use crate::models::SearchFailure;

/// Events that can trigger batch search state transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BatchSearchEvent {
    /// Runner picked the batch search up
    Start,
    /// All queries processed
    Succeed,
    /// A query failed
    Fail(SearchFailure),
    /// Return to the queued state, discarding partial results
    Reset,
    /// Withdraw a batch search that has not run
    Cancel,
}

impl BatchSearchEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Succeed => "succeed",
            Self::Fail(_) => "fail",
            Self::Reset => "reset",
            Self::Cancel => "cancel",
        }
    }

    pub fn failure(&self) -> Option<&SearchFailure> {
        match self {
            Self::Fail(failure) => Some(failure),
            _ => None,
        }
    }
}
