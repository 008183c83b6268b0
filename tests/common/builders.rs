//! Fixture builders shared by the integration tests.

use std::time::Duration;

use batchsearch_core::config::RunnerConfig;
use batchsearch_core::models::{BatchSearch, SearchHit, User};
use batchsearch_core::state_machine::TaskState;
use batchsearch_core::tasks::TaskHandle;

/// `size` hits with ids `{prefix}-{n}`
pub fn hits(prefix: &str, size: usize) -> Vec<SearchHit> {
    (0..size)
        .map(|n| SearchHit::new(format!("{prefix}-{n}"), format!("/data/{prefix}/{n}.txt")))
        .collect()
}

pub fn batch_search(queries: &[&str]) -> BatchSearch {
    BatchSearch::new("test-project", User::new("foo"), "test batch", queries.iter().copied())
}

pub fn runner_config() -> RunnerConfig {
    RunnerConfig::default()
}

pub fn runner_config_with(scroll_size: usize, max_batch_result_size: usize) -> RunnerConfig {
    RunnerConfig {
        scroll_size,
        max_batch_result_size,
        ..RunnerConfig::default()
    }
}

/// Poll `handle` until it reaches `state`, failing after one second
pub async fn wait_for_state(handle: &TaskHandle, state: TaskState) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while handle.state() != state {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {} never reached {}", handle.id(), state));
}
