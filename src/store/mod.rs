//! # Result Store
//!
//! Write side of the engine: batch search state transitions and the results
//! accumulated page by page. The runner only ever talks to the store through
//! [`ResultStore`], so relational and in-memory backends are interchangeable.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::constants::store as limits;
use crate::models::{BatchSearch, SearchFailure, SearchHit};
use crate::state_machine::{BatchSearchState, StateMachineError};

pub use memory::MemoryResultStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Batch search not found: {0}")]
    BatchSearchNotFound(Uuid),

    #[error("Batch search already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Invalid state change for batch search {id}: {source}")]
    InvalidTransition {
        id: Uuid,
        #[source]
        source: StateMachineError,
    },

    #[error("Unknown query for batch search {id}: {query}")]
    UnknownQuery { id: Uuid, query: String },

    #[error("Result store is closed")]
    Closed,

    #[error("Result store backend error: {0}")]
    Backend(String),
}

/// State written with [`ResultStore::set_state`]: either a plain state or a
/// failure carrying the offending query and its cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateUpdate {
    State(BatchSearchState),
    Failure(SearchFailure),
}

impl StateUpdate {
    pub fn state(&self) -> BatchSearchState {
        match self {
            Self::State(state) => *state,
            Self::Failure(_) => BatchSearchState::Failure,
        }
    }
}

impl From<BatchSearchState> for StateUpdate {
    fn from(state: BatchSearchState) -> Self {
        Self::State(state)
    }
}

impl From<SearchFailure> for StateUpdate {
    fn from(failure: SearchFailure) -> Self {
        Self::Failure(failure)
    }
}

/// Capacity of one multi-row insert of result rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInsertLimits {
    pub max_bind_parameters: usize,
    pub columns_per_row: usize,
    pub safety_margin_rows: usize,
}

impl BatchInsertLimits {
    /// Largest number of result rows a single insert may carry
    pub fn max_rows(&self) -> usize {
        let rows = self.max_bind_parameters / self.columns_per_row.max(1);
        rows.saturating_sub(self.safety_margin_rows).max(1)
    }
}

impl Default for BatchInsertLimits {
    fn default() -> Self {
        Self {
            max_bind_parameters: limits::MAX_BIND_PARAMETERS,
            columns_per_row: limits::COLUMNS_PER_RESULT_ROW,
            safety_margin_rows: limits::INSERT_SAFETY_MARGIN_ROWS,
        }
    }
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn get_batch_search(&self, id: Uuid) -> Result<BatchSearch, StoreError>;

    async fn set_state(&self, id: Uuid, update: StateUpdate) -> Result<(), StoreError>;

    /// Append one page of hits for `query`, in fetch order
    async fn save_results(&self, id: Uuid, query: &str, hits: &[SearchHit]) -> Result<(), StoreError>;

    /// Return the batch search to a re-runnable queued state, dropping partial results
    async fn reset(&self, id: Uuid) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError>;

    fn insert_limits(&self) -> BatchInsertLimits {
        BatchInsertLimits::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits_allow_3500_rows() {
        assert_eq!(BatchInsertLimits::default().max_rows(), 3_500);
    }

    #[test]
    fn test_limits_never_drop_to_zero() {
        let limits = BatchInsertLimits {
            max_bind_parameters: 10,
            columns_per_row: 9,
            safety_margin_rows: 5,
        };
        assert_eq!(limits.max_rows(), 1);
    }

    #[test]
    fn test_state_update_conversions() {
        let update: StateUpdate = BatchSearchState::Success.into();
        assert_eq!(update.state(), BatchSearchState::Success);

        let failure: StateUpdate = SearchFailure::new(None, "boom").into();
        assert_eq!(failure.state(), BatchSearchState::Failure);
    }
}
