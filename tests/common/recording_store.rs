//! Result store wrapper recording every write the runner makes.

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use batchsearch_core::models::{BatchSearch, SearchHit};
use batchsearch_core::store::{BatchInsertLimits, MemoryResultStore, ResultStore, StateUpdate, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    SetState(StateUpdate),
    SaveResults { query: String, hits: usize },
    Reset,
}

#[derive(Debug, Default)]
pub struct RecordingStore {
    pub inner: MemoryResultStore,
    calls: Mutex<Vec<StoreCall>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_insert_limits(limits: BatchInsertLimits) -> Self {
        Self {
            inner: MemoryResultStore::new().with_insert_limits(limits),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register `batch_search` and return its id
    pub fn register(&self, batch_search: BatchSearch) -> Uuid {
        let id = batch_search.uuid;
        self.inner
            .save_batch_search(batch_search)
            .expect("batch search registered");
        id
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Page sizes saved, in order
    pub fn saved_pages(&self) -> Vec<(String, usize)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::SaveResults { query, hits } => Some((query, hits)),
                _ => None,
            })
            .collect()
    }

    pub fn saved_results(&self) -> usize {
        self.saved_pages().iter().map(|(_, hits)| hits).sum()
    }

    pub fn state_updates(&self) -> Vec<StateUpdate> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::SetState(update) => Some(update),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ResultStore for RecordingStore {
    async fn get_batch_search(&self, id: Uuid) -> Result<BatchSearch, StoreError> {
        self.inner.get_batch_search(id).await
    }

    async fn set_state(&self, id: Uuid, update: StateUpdate) -> Result<(), StoreError> {
        self.calls.lock().push(StoreCall::SetState(update.clone()));
        self.inner.set_state(id, update).await
    }

    async fn save_results(&self, id: Uuid, query: &str, hits: &[SearchHit]) -> Result<(), StoreError> {
        self.calls.lock().push(StoreCall::SaveResults {
            query: query.to_string(),
            hits: hits.len(),
        });
        self.inner.save_results(id, query, hits).await
    }

    async fn reset(&self, id: Uuid) -> Result<(), StoreError> {
        self.calls.lock().push(StoreCall::Reset);
        self.inner.reset(id).await
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.inner.close().await
    }

    fn insert_limits(&self) -> BatchInsertLimits {
        self.inner.insert_limits()
    }
}
