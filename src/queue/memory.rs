use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, warn};

use super::{JobQueue, QueueError, QueueItem};

/// Unbounded in-process queue
#[derive(Debug)]
pub struct MemoryJobQueue {
    sender: mpsc::UnboundedSender<QueueItem>,
    receiver: Mutex<mpsc::UnboundedReceiver<QueueItem>>,
    interrupted: watch::Sender<bool>,
    pending: AtomicUsize,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (interrupted, _) = watch::channel(false);
        Self {
            sender,
            receiver: Mutex::new(receiver),
            interrupted,
            pending: AtomicUsize::new(0),
        }
    }

    /// Interrupt any blocked and future `poll` calls
    pub fn interrupt(&self) {
        warn!("Job queue interrupted");
        self.interrupted.send_replace(true);
    }

    pub fn len(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn poll(&self, timeout: Duration) -> Result<Option<QueueItem>, QueueError> {
        let mut interrupted = self.interrupted.subscribe();
        if *interrupted.borrow_and_update() {
            return Err(QueueError::Interrupted("queue interrupted".to_string()));
        }

        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            biased;
            _ = interrupted.wait_for(|flag| *flag) => {
                Err(QueueError::Interrupted("queue interrupted while polling".to_string()))
            }
            received = tokio::time::timeout(timeout, receiver.recv()) => match received {
                Ok(Some(item)) => {
                    self.pending.fetch_sub(1, Ordering::AcqRel);
                    debug!(item = %item, "Dequeued item");
                    Ok(Some(item))
                }
                Ok(None) => Err(QueueError::Interrupted("queue channel closed".to_string())),
                Err(_) => Ok(None),
            }
        }
    }

    async fn put(&self, item: QueueItem) -> Result<(), QueueError> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.sender.send(item).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            QueueError::Backend(format!("failed to enqueue {}: channel closed", e.0))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_items_are_dequeued_in_fifo_order() {
        let queue = MemoryJobQueue::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        queue.put(QueueItem::Dispatch(first)).await.unwrap();
        queue.put(QueueItem::Dispatch(second)).await.unwrap();
        queue.put(QueueItem::Shutdown).await.unwrap();
        assert_eq!(queue.len(), 3);

        let timeout = Duration::from_millis(10);
        assert_eq!(queue.poll(timeout).await.unwrap(), Some(QueueItem::Dispatch(first)));
        assert_eq!(queue.poll(timeout).await.unwrap(), Some(QueueItem::Dispatch(second)));
        assert_eq!(queue.poll(timeout).await.unwrap(), Some(QueueItem::Shutdown));
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_without_error() {
        let queue = MemoryJobQueue::new();
        assert_eq!(queue.poll(Duration::from_secs(60)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_wakes_blocked_poll() {
        let queue = Arc::new(MemoryJobQueue::new());
        let poller = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.poll(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.put(QueueItem::Shutdown).await.unwrap();
        assert_eq!(poller.await.unwrap().unwrap(), Some(QueueItem::Shutdown));
    }

    #[tokio::test]
    async fn test_interrupt_fails_blocked_poll() {
        let queue = Arc::new(MemoryJobQueue::new());
        let poller = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.poll(Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.interrupt();
        assert!(matches!(
            poller.await.unwrap(),
            Err(QueueError::Interrupted(_))
        ));
        assert!(matches!(
            queue.poll(Duration::from_millis(1)).await,
            Err(QueueError::Interrupted(_))
        ));
    }
}
