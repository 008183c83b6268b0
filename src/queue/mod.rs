//! # Job Queue
//!
//! Process-wide FIFO of batch search identifiers. Shutdown travels through the
//! same queue as an explicit [`QueueItem::Shutdown`] so that a consumer blocked
//! in [`JobQueue::poll`] wakes up, and no job identifier can ever be mistaken
//! for the shutdown signal.
//!
//! ```rust
//! use batchsearch_core::queue::{JobQueue, MemoryJobQueue, QueueItem};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let queue = MemoryJobQueue::new();
//! queue.put(QueueItem::Shutdown).await.unwrap();
//! let item = queue.poll(Duration::from_millis(10)).await.unwrap();
//! assert_eq!(item, Some(QueueItem::Shutdown));
//! # });
//! ```

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryJobQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum QueueItem {
    Dispatch(Uuid),
    Shutdown,
}

impl fmt::Display for QueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch(id) => write!(f, "dispatch({id})"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The blocking wait was interrupted; fatal for the consumer
    #[error("Queue wait interrupted: {0}")]
    Interrupted(String),

    #[error("Queue backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Wait up to `timeout` for the next item. `Ok(None)` means the wait
    /// timed out with nothing to dequeue.
    async fn poll(&self, timeout: Duration) -> Result<Option<QueueItem>, QueueError>;

    async fn put(&self, item: QueueItem) -> Result<(), QueueError>;

    async fn close(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
