//! # Task Manager
//!
//! Registry and worker pool for user tasks. Every submitted task is
//! registered under a fresh identifier, then executed on the Tokio runtime
//! once one of `parallelism` worker slots is free.
//!
//! ## Lifecycle
//!
//! ```text
//! CREATED ──(worker slot)──> RUNNING ──> DONE | ERROR | CANCELLED
//!    └──────────(cancel before start)──────────────────> CANCELLED
//! ```
//!
//! Entries stay registered until [`TaskManager::clean_done_tasks`] removes
//! the terminal ones.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::entry::{TaskEntry, TaskOutcome, TaskView};
use super::errors::TaskError;
use super::task::{TaskContext, TaskId, TaskPayload, UserTask};
use crate::config::TaskManagerConfig;
use crate::error::panic_message;
use crate::logging::log_task_operation;
use crate::models::User;
use crate::state_machine::TaskState;

/// Restricts [`TaskManager::list`] to one owner and/or a name fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub user: Option<User>,
    pub name: Option<String>,
}

impl TaskFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn accepts(&self, entry: &TaskEntry) -> bool {
        self.user.as_ref().map_or(true, |user| entry.user() == user)
            && self
                .name
                .as_deref()
                .map_or(true, |name| entry.name().contains(name))
    }
}

/// Live handle on a registered task
#[derive(Debug, Clone)]
pub struct TaskHandle {
    entry: Arc<TaskEntry>,
}

impl TaskHandle {
    pub fn id(&self) -> &TaskId {
        self.entry.id()
    }

    pub fn user(&self) -> &User {
        self.entry.user()
    }

    pub fn state(&self) -> TaskState {
        self.entry.state()
    }

    pub fn progress(&self) -> f64 {
        self.entry.progress()
    }

    pub fn view(&self) -> TaskView {
        self.entry.view()
    }

    pub fn cancel(&self) -> bool {
        self.entry.cancel()
    }

    /// Wait for the task to reach a terminal state
    pub async fn wait(&self) -> TaskView {
        self.entry.wait_terminal().await;
        self.entry.view()
    }

    /// Wait for the task and return what it produced
    pub async fn result(&self) -> Result<Option<TaskPayload>, TaskError> {
        self.entry.wait_terminal().await;
        self.entry.result()
    }
}

#[derive(Debug)]
pub struct TaskManager {
    tasks: DashMap<TaskId, Arc<TaskEntry>>,
    permits: Arc<Semaphore>,
    parallelism: usize,
    next_seq: AtomicU64,
    accepting: AtomicBool,
}

impl TaskManager {
    pub fn new(parallelism: usize) -> Self {
        let parallelism = parallelism.max(1);
        Self {
            tasks: DashMap::new(),
            permits: Arc::new(Semaphore::new(parallelism)),
            parallelism,
            next_seq: AtomicU64::new(0),
            accepting: AtomicBool::new(true),
        }
    }

    pub fn from_config(config: &TaskManagerConfig) -> Self {
        Self::new(config.parallelism)
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Register `task` under a fresh identifier and submit it to the worker
    /// pool. Must be called from within a Tokio runtime.
    pub fn start_task<T: UserTask>(&self, task: T) -> Result<TaskHandle, TaskError> {
        self.start_task_with_id(TaskId::generate(), task)
    }

    /// Same as [`start_task`](Self::start_task) with a caller-chosen
    /// identifier; fails if that identifier is already registered.
    pub fn start_task_with_id<T: UserTask>(&self, id: TaskId, task: T) -> Result<TaskHandle, TaskError> {
        if !self.accepting.load(Ordering::Acquire) {
            return Err(TaskError::ShuttingDown);
        }

        let entry = {
            match self.tasks.entry(id.clone()) {
                Entry::Occupied(_) => return Err(TaskError::AlreadyRegistered(id)),
                Entry::Vacant(vacant) => {
                    let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);
                    let entry = Arc::new(TaskEntry::new(
                        id.clone(),
                        task.user().clone(),
                        task.name().to_string(),
                        seq,
                    ));
                    vacant.insert(entry.clone());
                    entry
                }
            }
        };

        log_task_operation(
            "start",
            id.as_str(),
            Some(entry.name()),
            Some(&entry.user().id),
            "created",
            None,
        );

        tokio::spawn(execute(self.permits.clone(), entry.clone(), Box::new(task)));
        Ok(TaskHandle { entry })
    }

    pub fn get(&self, id: &TaskId) -> Result<TaskView, TaskError> {
        self.entry(id).map(|entry| entry.view())
    }

    pub fn handle(&self, id: &TaskId) -> Result<TaskHandle, TaskError> {
        self.entry(id).map(|entry| TaskHandle { entry })
    }

    /// Registered tasks in submission order
    pub fn list(&self, filter: &TaskFilter) -> Vec<TaskView> {
        self.entries()
            .into_iter()
            .filter(|entry| filter.accepts(entry))
            .map(|entry| entry.view())
            .collect()
    }

    /// Result of task `id` for `user`, waiting for the task to finish.
    ///
    /// `Ok(None)` when the task completed without a value.
    pub async fn result(&self, id: &TaskId, user: &User) -> Result<Option<TaskPayload>, TaskError> {
        let entry = self.entry(id)?;
        if entry.user() != user {
            warn!(task_id = %id, user = %user, owner = %entry.user(), "Forbidden task result request");
            return Err(TaskError::Forbidden {
                id: id.clone(),
                user: user.clone(),
            });
        }
        entry.wait_terminal().await;
        entry.result()
    }

    /// Request cancellation of task `id`. Returns whether anything changed.
    pub fn cancel(&self, id: &TaskId) -> Result<bool, TaskError> {
        let entry = self.entry(id)?;
        let changed = entry.cancel();
        if changed {
            info!(task_id = %id, "🛑 TASK MANAGER: cancellation requested");
        }
        Ok(changed)
    }

    /// Cancel every RUNNING task owned by `user`; returns those tasks
    pub fn stop_all(&self, user: &User) -> Vec<TaskView> {
        let stopped: Vec<TaskView> = self
            .entries()
            .into_iter()
            .filter(|entry| entry.user() == user && entry.state() == TaskState::Running)
            .map(|entry| {
                entry.cancel();
                entry.view()
            })
            .collect();
        info!(user = %user, stopped = stopped.len(), "🛑 TASK MANAGER: stopped tasks");
        stopped
    }

    /// Wait until every registered task is terminal or `timeout` elapses.
    /// Returns false on timeout.
    pub async fn wait_tasks_to_be_done(&self, timeout: Duration) -> bool {
        let entries = self.entries();
        let all_done = join_all(entries.iter().map(|entry| entry.wait_terminal()));
        let done = tokio::time::timeout(timeout, all_done).await.is_ok();
        if !done {
            debug!(timeout_ms = timeout.as_millis() as u64, "Timed out waiting for tasks");
        }
        done
    }

    /// Remove and return every terminal task
    pub fn clean_done_tasks(&self) -> Vec<TaskView> {
        let mut removed: Vec<Arc<TaskEntry>> = self
            .entries()
            .into_iter()
            .filter(|entry| entry.state().is_terminal())
            .filter_map(|entry| {
                self.tasks
                    .remove_if(entry.id(), |_, entry| entry.state().is_terminal())
                    .map(|(_, entry)| entry)
            })
            .collect();
        removed.sort_by_key(|entry| entry.seq());
        debug!(removed = removed.len(), "Cleaned done tasks");
        removed.iter().map(|entry| entry.view()).collect()
    }

    /// Stop accepting tasks, cancel every registered task and wait for them
    pub async fn close(&self, timeout: Duration) -> bool {
        self.accepting.store(false, Ordering::Release);
        for entry in self.entries() {
            entry.cancel();
        }
        let done = self.wait_tasks_to_be_done(timeout).await;
        info!(done = done, "TASK MANAGER: closed");
        done
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn entry(&self, id: &TaskId) -> Result<Arc<TaskEntry>, TaskError> {
        self.tasks
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TaskError::NotFound(id.clone()))
    }

    fn entries(&self) -> Vec<Arc<TaskEntry>> {
        let mut entries: Vec<Arc<TaskEntry>> =
            self.tasks.iter().map(|entry| entry.value().clone()).collect();
        entries.sort_by_key(|entry| entry.seq());
        entries
    }
}

async fn execute(permits: Arc<Semaphore>, entry: Arc<TaskEntry>, task: Box<dyn UserTask>) {
    let _permit = tokio::select! {
        permit = permits.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                entry.finish(TaskOutcome::Cancelled);
                return;
            }
        },
        _ = entry.cancel_flag().cancelled() => return,
    };

    if !entry.try_start() {
        return;
    }
    debug!(task_id = %entry.id(), "Task running");

    let context = TaskContext::new(entry.clone());
    let outcome = match AssertUnwindSafe(task.run(context)).catch_unwind().await {
        Ok(Ok(payload)) => TaskOutcome::Value(payload),
        Ok(Err(e)) => TaskOutcome::Failed(format!("{e:#}")),
        Err(panic) => TaskOutcome::Failed(format!("task panicked: {}", panic_message(panic.as_ref()))),
    };

    let state = entry.finish(outcome);
    let details = match state {
        TaskState::Error => entry.result().err().map(|e| e.to_string()),
        _ => None,
    };
    log_task_operation(
        "run",
        entry.id().as_str(),
        Some(entry.name()),
        Some(&entry.user().id),
        &state.to_string(),
        details.as_deref(),
    );
}
