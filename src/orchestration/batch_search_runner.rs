//! # Batch Search Runner
//!
//! Executes one batch search: every query in order, page by page, against the
//! search backend, persisting each page to the result store. Cancellation,
//! the wall-clock budget, the result cap and backend failures all end in a
//! persisted state, panics included; the caller only ever receives the
//! number of results processed, or an error when the batch search could not
//! be started at all.

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::cancellation::CancelFlag;
use crate::config::RunnerConfig;
use crate::error::{panic_message, Result};
use crate::logging::log_batch_operation;
use crate::models::{BatchSearch, SearchFailure};
use crate::search::{SearchBackend, SearchCursor, SearchError, SearchRequest};
use crate::state_machine::BatchSearchState;
use crate::store::{ResultStore, StoreError};

/// Callback notified with the new progress rate after each completed query
pub type ProgressListener = Arc<dyn Fn(f64) + Send + Sync>;

/// Query-level progress of the batch search currently executing.
///
/// Written by the runner only, readable at any time by monitors.
#[derive(Debug, Default)]
pub struct BatchProgress {
    processed: AtomicUsize,
    total: AtomicUsize,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fully processed queries over total queries, 0.0 for an empty batch
    pub fn rate(&self) -> f64 {
        let total = self.total.load(Ordering::Acquire);
        if total == 0 {
            return 0.0;
        }
        self.processed.load(Ordering::Acquire) as f64 / total as f64
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    fn start(&self, total: usize) {
        self.processed.store(0, Ordering::Release);
        self.total.store(total, Ordering::Release);
    }

    fn record_query(&self) -> f64 {
        self.processed.fetch_add(1, Ordering::AcqRel);
        self.rate()
    }
}

/// Why a batch search stopped before completing every query
#[derive(Debug, Error)]
enum RunFailure {
    #[error("Batch search cancelled")]
    Cancelled,

    #[error("Batch timed out after {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Panicked(String),
}

pub struct BatchSearchRunner {
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn ResultStore>,
    config: RunnerConfig,
    cancel: CancelFlag,
    progress: Arc<BatchProgress>,
    progress_listener: Option<ProgressListener>,
}

impl fmt::Debug for BatchSearchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSearchRunner")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl BatchSearchRunner {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn ResultStore>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            backend,
            store,
            config,
            cancel: CancelFlag::new(),
            progress: Arc::new(BatchProgress::new()),
            progress_listener: None,
        }
    }

    /// Share an externally owned cancel flag, e.g. the one of a managed task
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_listener(mut self, listener: ProgressListener) -> Self {
        self.progress_listener = Some(listener);
        self
    }

    /// Ask the batch search in flight to stop at its next page
    pub fn cancel(&self) {
        if self.cancel.cancel() {
            info!("🛑 BATCH RUNNER: cancellation requested");
        }
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn progress(&self) -> Arc<BatchProgress> {
        self.progress.clone()
    }

    pub fn progress_rate(&self) -> f64 {
        self.progress.rate()
    }

    /// Scroll page size actually used: the configured size, bounded by the
    /// store's insert capacity and the optional configured ceiling.
    pub fn effective_page_size(&self) -> usize {
        let capacity = self.store.insert_limits().max_rows();
        let ceiling = match self.config.scroll_size_ceiling {
            Some(ceiling) if ceiling > capacity => {
                warn!(
                    configured = ceiling,
                    capacity = capacity,
                    "Scroll size ceiling exceeds result store insert capacity, clamping"
                );
                capacity
            }
            Some(ceiling) => ceiling,
            None => capacity,
        };
        self.config.scroll_size.min(ceiling).max(1)
    }

    /// Load the batch search `id` and execute it.
    ///
    /// Only a batch search that is missing or cannot be started is reported
    /// as an error; every failure during execution is persisted as the batch
    /// search state.
    pub async fn run(&self, id: Uuid) -> Result<usize> {
        let batch_search = self.store.get_batch_search(id).await?;
        self.call(&batch_search).await
    }

    /// Execute `batch_search` and return the number of results processed
    #[instrument(skip(self, batch_search), fields(batch_search_id = %batch_search.uuid))]
    pub async fn call(&self, batch_search: &BatchSearch) -> Result<usize> {
        let id = batch_search.uuid;
        let page_size = self.effective_page_size();
        self.progress.start(batch_search.queries.len());

        info!(
            queries = batch_search.queries.len(),
            project = %batch_search.project,
            throttle_ms = self.config.throttle_ms,
            page_size = page_size,
            "🔎 BATCH RUNNER: running batch search"
        );

        if let Err(e) = self
            .store
            .set_state(id, BatchSearchState::Running.into())
            .await
        {
            error!(error = %e, "Could not mark batch search as running");
            return Err(e.into());
        }
        log_batch_operation("run", id, None, "running", None);

        let mut total = 0;
        let mut failure = None;
        for query in batch_search.query_texts() {
            let outcome = AssertUnwindSafe(self.run_query(batch_search, query, page_size, &mut total))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(RunFailure::Panicked(panic_message(panic.as_ref()))));
            if let Err(e) = outcome {
                failure = Some((query.to_string(), e));
                break;
            }
            let rate = self.progress.record_query();
            if let Some(listener) = &self.progress_listener {
                listener(rate);
            }
        }

        let recorded = match failure {
            None => {
                info!(results = total, "✅ BATCH RUNNER: done batch search with success");
                log_batch_operation("run", id, None, "success", None);
                self.store
                    .set_state(id, BatchSearchState::Success.into())
                    .await
            }
            Some((query, RunFailure::Cancelled)) => {
                info!(query = %query, "🛑 BATCH RUNNER: cancelling batch search");
                log_batch_operation("run", id, Some(&query), "cancelled", None);
                self.store.reset(id).await
            }
            Some((query, RunFailure::Search(e))) => {
                error!(query = %query, error = %e, "❌ BATCH RUNNER: search backend error");
                let cause = e.most_specific_cause();
                log_batch_operation("run", id, Some(&query), "failure", Some(&cause));
                self.store
                    .set_state(id, SearchFailure::new(Some(query), cause).into())
                    .await
            }
            Some((query, other)) => {
                error!(query = %query, error = %other, "❌ BATCH RUNNER: error when running batch search");
                let cause = other.to_string();
                log_batch_operation("run", id, Some(&query), "failure", Some(&cause));
                self.store
                    .set_state(id, SearchFailure::new(Some(query), cause).into())
                    .await
            }
        };
        if let Err(e) = recorded {
            error!(error = %e, "Could not record batch search outcome");
        }

        Ok(total)
    }

    async fn run_query(
        &self,
        batch_search: &BatchSearch,
        query: &str,
        page_size: usize,
        total: &mut usize,
    ) -> std::result::Result<(), RunFailure> {
        let request = SearchRequest::for_batch_search(batch_search, query, page_size);
        let mut cursor = self.backend.search(&batch_search.project, &request).await?;

        let outcome = self
            .scroll(batch_search.uuid, query, cursor.as_mut(), page_size, total)
            .await;

        if let Err(e) = cursor.clear().await {
            warn!(query = %query, error = %e, "Could not clear scroll cursor");
        }
        outcome
    }

    async fn scroll(
        &self,
        id: Uuid,
        query: &str,
        cursor: &mut dyn SearchCursor,
        page_size: usize,
        total: &mut usize,
    ) -> std::result::Result<(), RunFailure> {
        let limit = self.config.max_batch_result_size.saturating_sub(page_size);
        let max_time = self.config.max_time();
        let throttle = self.config.throttle();

        let mut page = cursor.next_page().await?;
        let started = Instant::now();

        while !page.is_empty() && *total < limit {
            if self.cancel.is_cancelled() {
                return Err(RunFailure::Cancelled);
            }
            page.truncate(page_size);
            self.store.save_results(id, query, &page).await?;

            if started.elapsed() < max_time {
                if !throttle.is_zero() {
                    tokio::time::sleep(throttle).await;
                }
            } else {
                return Err(RunFailure::Timeout(self.config.max_time_seconds));
            }

            *total += page.len();
            debug!(query = %query, page = page.len(), total = *total, "Page persisted");
            page = cursor.next_page().await?;
        }
        Ok(())
    }

    /// Release the search backend and the result store
    pub async fn close(&self) {
        if let Err(e) = self.backend.close().await {
            error!(error = %e, "Could not close search backend");
        }
        info!("Closing result store");
        if let Err(e) = self.store.close().await {
            error!(error = %e, "Could not close result store");
        }
    }
}
