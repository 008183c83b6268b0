#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Batch Search Core
//!
//! Asynchronous batch search execution engine and user task manager.
//!
//! ## Overview
//!
//! A batch search is an ordered list of queries run against one project's
//! index. Identifiers of queued batch searches flow through a job queue to a
//! single consumer loop, which hands each one to the runner. The runner
//! scrolls through every query's results page by page, persisting them to a
//! result store while enforcing a throttle, a wall-clock budget and a global
//! result cap. Every failure ends up as persisted state; only an interrupted
//! queue wait stops the consumer.
//!
//! Independently, the task manager tracks arbitrary user work as monitorable,
//! cancellable, owner-scoped tasks. A batch search can run as one of them.
//!
//! ## Module Organization
//!
//! - [`models`] - Batch searches, queries, hits and users
//! - [`state_machine`] - Batch search and task states, batch search transitions
//! - [`search`] - Search backend and scroll cursor seams
//! - [`store`] - Result store seam and in-memory implementation
//! - [`queue`] - Job queue with an explicit shutdown item
//! - [`orchestration`] - Runner, consumer loop and shutdown hook
//! - [`tasks`] - Task manager and user tasks
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use batchsearch_core::config::ConfigManager;
//! use batchsearch_core::orchestration::{BatchSearchLoop, BatchSearchRunner};
//! use batchsearch_core::queue::MemoryJobQueue;
//! use batchsearch_core::search::MemorySearchBackend;
//! use batchsearch_core::store::MemoryResultStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//!
//! let runner = BatchSearchRunner::new(
//!     Arc::new(MemorySearchBackend::new()),
//!     Arc::new(MemoryResultStore::new()),
//!     config.runner.clone(),
//! );
//! let consumer = BatchSearchLoop::new(Arc::new(runner), Arc::new(MemoryJobQueue::new()), &config.queue);
//!
//! let shutdown = consumer.shutdown_hook();
//! tokio::spawn(batchsearch_core::orchestration::listen_for_signals(shutdown));
//! consumer.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod cancellation;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod queue;
pub mod search;
pub mod state_machine;
pub mod store;
pub mod tasks;

pub use cancellation::CancelFlag;
pub use crate::config::{BatchSearchConfig, ConfigManager};
pub use error::{BatchSearchError, Result};
pub use models::{BatchSearch, SearchHit, User};
pub use orchestration::{BatchSearchLoop, BatchSearchRunner, ShutdownHook};
pub use queue::{JobQueue, QueueItem};
pub use search::SearchBackend;
pub use state_machine::{BatchSearchState, TaskState};
pub use store::ResultStore;
pub use tasks::{TaskManager, UserTask};
