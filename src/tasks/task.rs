//! # User Tasks
//!
//! The unit of work accepted by the [`TaskManager`](super::TaskManager): any
//! asynchronous computation owned by a user, optionally producing a payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use super::entry::TaskEntry;
use crate::cancellation::CancelFlag;
use crate::models::User;

/// Process-unique task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Fresh identifier from a random token
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Value produced by a completed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TaskPayload {
    Json(serde_json::Value),
    /// A file produced on disk, e.g. an export
    File(PathBuf),
}

impl TaskPayload {
    pub fn json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        serde_json::to_value(value).map(Self::Json)
    }
}

/// Handle given to a running task to report progress and observe cancellation
#[derive(Debug, Clone)]
pub struct TaskContext {
    entry: Arc<TaskEntry>,
}

impl TaskContext {
    pub(crate) fn new(entry: Arc<TaskEntry>) -> Self {
        Self { entry }
    }

    pub fn id(&self) -> &TaskId {
        self.entry.id()
    }

    pub fn user(&self) -> &User {
        self.entry.user()
    }

    /// Report progress in [0.0, 1.0]. Lower values than the current one are
    /// ignored and 1.0 is only reached when the task completes.
    pub fn set_progress(&self, progress: f64) {
        self.entry.set_progress(progress);
    }

    pub fn progress(&self) -> f64 {
        self.entry.progress()
    }

    pub fn is_cancelled(&self) -> bool {
        self.entry.cancel_flag().is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.entry.cancel_flag().cancelled().await
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.entry.cancel_flag().clone()
    }
}

#[async_trait]
pub trait UserTask: Send + 'static {
    fn user(&self) -> &User;

    /// Display name, also matched by list filters
    fn name(&self) -> &str;

    async fn run(self: Box<Self>, ctx: TaskContext) -> anyhow::Result<Option<TaskPayload>>;
}

/// Adapter turning a closure into a [`UserTask`]
pub struct FnTask<F> {
    user: User,
    name: String,
    work: F,
}

impl<F> fmt::Debug for FnTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTask")
            .field("user", &self.user)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<F, Fut> FnTask<F>
where
    F: FnOnce(TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Option<TaskPayload>>> + Send + 'static,
{
    pub fn new(user: User, name: impl Into<String>, work: F) -> Self {
        Self {
            user,
            name: name.into(),
            work,
        }
    }
}

#[async_trait]
impl<F, Fut> UserTask for FnTask<F>
where
    F: FnOnce(TaskContext) -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<Option<TaskPayload>>> + Send + 'static,
{
    fn user(&self) -> &User {
        &self.user
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(self: Box<Self>, ctx: TaskContext) -> anyhow::Result<Option<TaskPayload>> {
        (self.work)(ctx).await
    }
}
