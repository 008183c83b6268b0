use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use uuid::Uuid;

use super::{BatchInsertLimits, ResultStore, StateUpdate, StoreError};
use crate::models::{BatchSearch, BatchSearchResult, SearchFailure, SearchHit};
use crate::state_machine::{BatchSearchEvent, BatchSearchState, BatchSearchStateMachine};

#[derive(Debug, Clone)]
struct StoredBatchSearch {
    batch_search: BatchSearch,
    machine: BatchSearchStateMachine,
    results: Vec<BatchSearchResult>,
}

/// Result store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    batch_searches: DashMap<Uuid, StoredBatchSearch>,
    limits: BatchInsertLimits,
    closed: AtomicBool,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert_limits(mut self, limits: BatchInsertLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Register a new batch search in the queued state
    pub fn save_batch_search(&self, batch_search: BatchSearch) -> Result<(), StoreError> {
        self.ensure_open()?;
        match self.batch_searches.entry(batch_search.uuid) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(batch_search.uuid)),
            Entry::Vacant(vacant) => {
                debug!(batch_search_id = %batch_search.uuid, "Batch search saved");
                vacant.insert(StoredBatchSearch {
                    batch_search,
                    machine: BatchSearchStateMachine::new(),
                    results: Vec::new(),
                });
                Ok(())
            }
        }
    }

    pub fn get_state(&self, id: Uuid) -> Result<BatchSearchState, StoreError> {
        self.batch_searches
            .get(&id)
            .map(|stored| stored.machine.current_state())
            .ok_or(StoreError::BatchSearchNotFound(id))
    }

    pub fn get_failure(&self, id: Uuid) -> Result<Option<SearchFailure>, StoreError> {
        self.batch_searches
            .get(&id)
            .map(|stored| stored.machine.failure().cloned())
            .ok_or(StoreError::BatchSearchNotFound(id))
    }

    pub fn get_results(&self, id: Uuid) -> Result<Vec<BatchSearchResult>, StoreError> {
        self.batch_searches
            .get(&id)
            .map(|stored| stored.results.clone())
            .ok_or(StoreError::BatchSearchNotFound(id))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn apply(&self, id: Uuid, event: BatchSearchEvent) -> Result<BatchSearchState, StoreError> {
        let mut stored = self
            .batch_searches
            .get_mut(&id)
            .ok_or(StoreError::BatchSearchNotFound(id))?;
        let is_reset = matches!(event, BatchSearchEvent::Reset);
        let state = stored
            .machine
            .transition(event)
            .map_err(|source| StoreError::InvalidTransition { id, source })?;

        if is_reset {
            stored.results.clear();
            for query in &mut stored.batch_search.queries {
                query.result_count = 0;
            }
        }
        Ok(state)
    }
}

fn event_for(update: StateUpdate) -> BatchSearchEvent {
    match update {
        StateUpdate::Failure(failure) => BatchSearchEvent::Fail(failure),
        StateUpdate::State(BatchSearchState::Running) => BatchSearchEvent::Start,
        StateUpdate::State(BatchSearchState::Success) => BatchSearchEvent::Succeed,
        StateUpdate::State(BatchSearchState::Queued) => BatchSearchEvent::Reset,
        StateUpdate::State(BatchSearchState::Cancelled) => BatchSearchEvent::Cancel,
        StateUpdate::State(BatchSearchState::Failure) => {
            BatchSearchEvent::Fail(SearchFailure::new(None, "unspecified failure"))
        }
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn get_batch_search(&self, id: Uuid) -> Result<BatchSearch, StoreError> {
        self.ensure_open()?;
        self.batch_searches
            .get(&id)
            .map(|stored| stored.batch_search.clone())
            .ok_or(StoreError::BatchSearchNotFound(id))
    }

    async fn set_state(&self, id: Uuid, update: StateUpdate) -> Result<(), StoreError> {
        self.ensure_open()?;
        let state = self.apply(id, event_for(update))?;
        debug!(batch_search_id = %id, state = %state, "Batch search state changed");
        Ok(())
    }

    async fn save_results(&self, id: Uuid, query: &str, hits: &[SearchHit]) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut stored = self
            .batch_searches
            .get_mut(&id)
            .ok_or(StoreError::BatchSearchNotFound(id))?;
        let stored = &mut *stored;

        let batch_query = stored
            .batch_search
            .query_mut(query)
            .ok_or_else(|| StoreError::UnknownQuery {
                id,
                query: query.to_string(),
            })?;
        let first_doc_nb = batch_query.result_count;
        batch_query.result_count += hits.len();

        stored
            .results
            .extend(hits.iter().enumerate().map(|(offset, hit)| BatchSearchResult {
                query: query.to_string(),
                doc_nb: first_doc_nb + offset,
                hit: hit.clone(),
            }));
        Ok(())
    }

    async fn reset(&self, id: Uuid) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.apply(id, BatchSearchEvent::Reset)?;
        debug!(batch_search_id = %id, "Batch search reset");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Closing result store");
        }
        Ok(())
    }

    fn insert_limits(&self) -> BatchInsertLimits {
        self.limits
    }
}
