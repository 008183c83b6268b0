//! # Batch Search Loop
//!
//! Single consumer of the job queue. Dequeues one batch search identifier at
//! a time and hands it to the [`BatchSearchRunner`]; a bad job never stops
//! the loop, only [`QueueItem::Shutdown`] or an interrupted wait does.

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::batch_search_runner::BatchSearchRunner;
use super::shutdown::ShutdownHook;
use crate::config::QueueConfig;
use crate::error::{panic_message, BatchSearchError, Result};
use crate::queue::{JobQueue, QueueError, QueueItem};

pub struct BatchSearchLoop {
    runner: Arc<BatchSearchRunner>,
    queue: Arc<dyn JobQueue>,
    poll_timeout: Duration,
}

impl fmt::Debug for BatchSearchLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchSearchLoop")
            .field("runner", &self.runner)
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}

impl BatchSearchLoop {
    pub fn new(runner: Arc<BatchSearchRunner>, queue: Arc<dyn JobQueue>, config: &QueueConfig) -> Self {
        Self {
            runner,
            queue,
            poll_timeout: config.poll_timeout(),
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn runner(&self) -> &Arc<BatchSearchRunner> {
        &self.runner
    }

    /// Hook that stops this loop and cancels the batch search in flight
    pub fn shutdown_hook(&self) -> ShutdownHook {
        ShutdownHook::new(self.queue.clone(), self.runner.cancel_flag())
    }

    /// Consume the queue until shutdown, then release the search backend,
    /// the result store and the queue however the loop ended.
    pub async fn run(&self) -> Result<()> {
        info!(
            poll_timeout_secs = self.poll_timeout.as_secs(),
            "🔁 BATCH LOOP: waiting for batch searches"
        );
        let outcome = self.consume().await;
        self.close().await;
        outcome
    }

    async fn consume(&self) -> Result<()> {
        loop {
            let item = match self.queue.poll(self.poll_timeout).await {
                Ok(item) => item,
                Err(QueueError::Interrupted(reason)) => {
                    error!(reason = %reason, "💥 BATCH LOOP: interrupted while waiting for batch searches");
                    return Err(BatchSearchError::Interrupted(reason));
                }
                Err(e) => {
                    error!(error = %e, "error during main loop");
                    continue;
                }
            };

            match item {
                None => continue,
                Some(QueueItem::Shutdown) => break,
                Some(QueueItem::Dispatch(id)) => self.dispatch(id).await,
            }
        }
        info!("🔁 BATCH LOOP: exiting main loop");
        Ok(())
    }

    async fn dispatch(&self, id: Uuid) {
        let outcome = AssertUnwindSafe(self.runner.run(id)).catch_unwind().await;
        match outcome {
            Ok(Ok(processed)) => {
                info!(batch_search_id = %id, processed = processed, "Batch search processed");
            }
            Ok(Err(e)) if e.is_not_found() => {
                warn!(batch_search_id = %id, "batch was not executed: {}", e);
            }
            Ok(Err(e)) => {
                error!(batch_search_id = %id, error = %e, "error during main loop");
            }
            Err(panic) => {
                error!(
                    batch_search_id = %id,
                    panic = %panic_message(panic.as_ref()),
                    "error during main loop"
                );
            }
        }
    }

    async fn close(&self) {
        self.runner.close().await;
        if let Err(e) = self.queue.close().await {
            error!(error = %e, "Could not close job queue");
        }
    }
}
