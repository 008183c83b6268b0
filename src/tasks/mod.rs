//! # Task Management
//!
//! Generic lifecycle management for asynchronous user work, independent of
//! batch searches: submission, progress polling, owner-scoped results,
//! cooperative cancellation and cleanup of finished tasks.

pub mod batch_search_task;
mod entry;
pub mod errors;
pub mod response;
pub mod task;
pub mod task_manager;

pub use batch_search_task::BatchSearchTask;
pub use entry::TaskView;
pub use errors::TaskError;
pub use response::{error_body, task_result_response, task_view_response, TaskResponse};
pub use task::{FnTask, TaskContext, TaskId, TaskPayload, UserTask};
pub use task_manager::{TaskFilter, TaskHandle, TaskManager};
