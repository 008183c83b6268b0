//! # Batch Search Configuration
//!
//! Typed configuration for the runner, the job queue consumer and the task
//! manager, loaded in layers by [`ConfigManager`]:
//!
//! 1. built-in defaults
//! 2. `config/batch-search.toml` (optional)
//! 3. `config/batch-search.<environment>.toml` (optional)
//! 4. `BATCHSEARCH_*` environment variables, `__` separating sections
//!    (e.g. `BATCHSEARCH_RUNNER__THROTTLE_MS=250`)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batchsearch_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let throttle = manager.config().runner.throttle();
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{self, runner as runner_defaults};
use crate::error::{BatchSearchError, Result};

pub use loader::ConfigManager;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BatchSearchConfig {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub task_manager: TaskManagerConfig,
}

/// Budgets applied by the batch search runner
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Pause between two pages of the same query
    pub throttle_ms: u64,
    /// Wall-clock budget for the pages of one query
    pub max_time_seconds: u64,
    /// Requested scroll page size, clamped to the store's insert capacity
    pub scroll_size: usize,
    /// Optional lower ceiling for the page size; never above the store's capacity
    pub scroll_size_ceiling: Option<usize>,
    /// Cap on results persisted for one batch search
    pub max_batch_result_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            throttle_ms: runner_defaults::DEFAULT_THROTTLE_MS,
            max_time_seconds: runner_defaults::DEFAULT_MAX_TIME_SECONDS,
            scroll_size: runner_defaults::DEFAULT_SCROLL_SIZE,
            scroll_size_ceiling: None,
            max_batch_result_size: constants::MAX_BATCH_RESULT_SIZE,
        }
    }
}

impl RunnerConfig {
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn max_time(&self) -> Duration {
        Duration::from_secs(self.max_time_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    pub poll_timeout_seconds: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_timeout_seconds: constants::queue::DEFAULT_POLL_TIMEOUT.as_secs(),
        }
    }
}

impl QueueConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TaskManagerConfig {
    /// Number of tasks allowed to run at the same time
    pub parallelism: usize,
}

impl Default for TaskManagerConfig {
    fn default() -> Self {
        Self {
            parallelism: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl BatchSearchConfig {
    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let runner = &self.runner;
        if runner.scroll_size == 0 {
            return Err(invalid("runner.scroll_size must be positive"));
        }
        if runner.scroll_size_ceiling == Some(0) {
            return Err(invalid("runner.scroll_size_ceiling must be positive"));
        }
        if runner.max_batch_result_size <= runner.scroll_size {
            return Err(invalid(format!(
                "runner.max_batch_result_size ({}) must be larger than runner.scroll_size ({})",
                runner.max_batch_result_size, runner.scroll_size
            )));
        }
        if self.queue.poll_timeout_seconds == 0 {
            return Err(invalid("queue.poll_timeout_seconds must be positive"));
        }
        if self.task_manager.parallelism == 0 {
            return Err(invalid("task_manager.parallelism must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> BatchSearchError {
    BatchSearchError::ConfigurationError(message.into())
}
