//! Process shutdown wiring for the batch search consumer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::cancellation::CancelFlag;
use crate::queue::{JobQueue, QueueItem};

/// Stops the consumer: wakes a blocked poll with [`QueueItem::Shutdown`] and
/// cancels the batch search in flight. Safe to trigger any number of times.
#[derive(Clone)]
pub struct ShutdownHook {
    queue: Arc<dyn JobQueue>,
    cancel: CancelFlag,
    fired: Arc<AtomicBool>,
}

impl fmt::Debug for ShutdownHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHook")
            .field("fired", &self.has_fired())
            .finish_non_exhaustive()
    }
}

impl ShutdownHook {
    pub fn new(queue: Arc<dyn JobQueue>, cancel: CancelFlag) -> Self {
        Self {
            queue,
            cancel,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn trigger(&self) {
        if self.fired.swap(true, Ordering::AcqRel) {
            debug!("Shutdown already triggered");
            return;
        }
        info!("🛑 SHUTDOWN: stopping batch search consumer");
        if let Err(e) = self.queue.put(QueueItem::Shutdown).await {
            error!(error = %e, "Could not enqueue shutdown");
        }
        self.cancel.cancel();
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Wait for Ctrl+C or SIGTERM, then trigger `hook`
pub async fn listen_for_signals(hook: ShutdownHook) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("🛑 Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => warn!("⚠️  Error listening for Ctrl+C: {}", e),
        },
        result = wait_for_sigterm() => match result {
            Ok(()) => info!("🛑 Received SIGTERM, initiating graceful shutdown..."),
            Err(e) => warn!("⚠️  Error setting up SIGTERM handler: {}", e),
        },
    }
    hook.trigger().await;
}

#[cfg(unix)]
async fn wait_for_sigterm() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> std::io::Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}
