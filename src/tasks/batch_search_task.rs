use async_trait::async_trait;
use std::sync::Arc;

use super::task::{TaskContext, TaskPayload, UserTask};
use crate::config::RunnerConfig;
use crate::models::{BatchSearch, User};
use crate::orchestration::BatchSearchRunner;
use crate::search::SearchBackend;
use crate::store::ResultStore;

/// Runs one batch search as a managed task.
///
/// The batch search must already be registered in the result store. Runner
/// progress becomes task progress, cancelling the task resets the batch
/// search, and the task value is the number of results processed. A batch
/// search that cannot be started fails the task.
pub struct BatchSearchTask {
    name: String,
    batch_search: BatchSearch,
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn ResultStore>,
    config: RunnerConfig,
}

impl BatchSearchTask {
    pub fn new(
        batch_search: BatchSearch,
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn ResultStore>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            name: format!("BatchSearchTask[{}]", batch_search.name),
            batch_search,
            backend,
            store,
            config,
        }
    }
}

#[async_trait]
impl UserTask for BatchSearchTask {
    fn user(&self) -> &User {
        &self.batch_search.user
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(self: Box<Self>, ctx: TaskContext) -> anyhow::Result<Option<TaskPayload>> {
        let progress = ctx.clone();
        let runner = BatchSearchRunner::new(self.backend, self.store, self.config)
            .with_cancel_flag(ctx.cancel_flag())
            .with_progress_listener(Arc::new(move |rate| progress.set_progress(rate)));

        let processed = runner.call(&self.batch_search).await?;
        Ok(Some(TaskPayload::json(&processed)?))
    }
}
