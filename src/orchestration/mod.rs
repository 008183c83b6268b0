//! # Batch Search Orchestration
//!
//! The batch execution path of the engine:
//!
//! - **BatchSearchLoop**: single consumer of the job queue, dispatching one
//!   batch search at a time and surviving per-job failures
//! - **BatchSearchRunner**: runs every query of one batch search page by page,
//!   enforcing throttle, time budget and result cap, and persisting the outcome
//! - **ShutdownHook**: process shutdown that wakes the consumer and cancels the
//!   batch search in flight
//!
//! Data flows producer → job queue → loop → runner → search backend (read) and
//! result store (write).

pub mod batch_search_loop;
pub mod batch_search_runner;
pub mod shutdown;

pub use batch_search_loop::BatchSearchLoop;
pub use batch_search_runner::{BatchProgress, BatchSearchRunner, ProgressListener};
pub use shutdown::{listen_for_signals, ShutdownHook};
