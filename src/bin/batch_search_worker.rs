//! # Batch Search Worker
//!
//! Standalone consumer process: loads configuration, seeds the in-process
//! index and job set, then consumes the job queue until Ctrl+C or SIGTERM.
//!
//! - `BATCHSEARCH_DOCUMENTS`: JSON file mapping project names to documents
//! - `BATCHSEARCH_JOBS`: JSON file with the batch searches to queue

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use batchsearch_core::config::ConfigManager;
use batchsearch_core::logging::init_structured_logging;
use batchsearch_core::models::BatchSearch;
use batchsearch_core::orchestration::{listen_for_signals, BatchSearchLoop, BatchSearchRunner};
use batchsearch_core::queue::{JobQueue, MemoryJobQueue, QueueItem};
use batchsearch_core::search::{IndexedDocument, MemorySearchBackend};
use batchsearch_core::store::MemoryResultStore;

#[tokio::main]
async fn main() -> Result<()> {
    init_structured_logging();

    let manager = ConfigManager::load().context("loading configuration")?;
    let config = manager.config();
    info!(environment = %manager.environment(), "🚀 Batch search worker starting");

    let backend = Arc::new(MemorySearchBackend::new());
    if let Ok(path) = std::env::var("BATCHSEARCH_DOCUMENTS") {
        let documents: HashMap<String, Vec<IndexedDocument>> = read_json(Path::new(&path))?;
        for (project, documents) in documents {
            backend.index_all(&project, documents);
            info!(project = %project, documents = backend.document_count(&project), "Project indexed");
        }
    }

    let store = Arc::new(MemoryResultStore::new());
    let queue = Arc::new(MemoryJobQueue::new());
    if let Ok(path) = std::env::var("BATCHSEARCH_JOBS") {
        let jobs: Vec<BatchSearch> = read_json(Path::new(&path))?;
        for job in jobs {
            let id = job.uuid;
            store.save_batch_search(job)?;
            queue.put(QueueItem::Dispatch(id)).await?;
        }
        info!(queued = queue.len(), "Batch searches queued");
    }

    let runner = BatchSearchRunner::new(backend, store, config.runner.clone());
    let consumer = BatchSearchLoop::new(Arc::new(runner), queue, &config.queue);
    tokio::spawn(listen_for_signals(consumer.shutdown_hook()));

    info!("🔄 Worker running... Press Ctrl+C to shutdown gracefully");
    consumer.run().await?;
    info!("✅ Worker shutdown complete");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
