//! Registry entry of one task: state, progress, outcome and cancel flag.
//!
//! State and progress change together through one `watch` channel, so a
//! snapshot never pairs a RUNNING state with a completed progress and waiters
//! observe every terminal transition.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use super::errors::TaskError;
use super::task::{TaskId, TaskPayload};
use crate::cancellation::CancelFlag;
use crate::models::User;
use crate::state_machine::TaskState;

/// Highest progress a task can report before it is DONE
const RUNNING_PROGRESS_CEILING: f64 = 1.0 - f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
struct TaskStatus {
    state: TaskState,
    progress: f64,
}

/// How a task ended
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TaskOutcome {
    Value(Option<TaskPayload>),
    Failed(String),
    Cancelled,
}

/// Snapshot of a registered task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub id: TaskId,
    pub name: String,
    pub user: User,
    pub state: TaskState,
    pub progress: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub(crate) struct TaskEntry {
    id: TaskId,
    user: User,
    name: String,
    seq: u64,
    created_at: DateTime<Utc>,
    status: watch::Sender<TaskStatus>,
    outcome: Mutex<Option<TaskOutcome>>,
    cancel: CancelFlag,
}

impl TaskEntry {
    pub(crate) fn new(id: TaskId, user: User, name: String, seq: u64) -> Self {
        let (status, _) = watch::channel(TaskStatus {
            state: TaskState::Created,
            progress: 0.0,
        });
        Self {
            id,
            user,
            name,
            seq,
            created_at: Utc::now(),
            status,
            outcome: Mutex::new(None),
            cancel: CancelFlag::new(),
        }
    }

    pub(crate) fn id(&self) -> &TaskId {
        &self.id
    }

    pub(crate) fn user(&self) -> &User {
        &self.user
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }

    pub(crate) fn state(&self) -> TaskState {
        self.status.borrow().state
    }

    pub(crate) fn progress(&self) -> f64 {
        self.status.borrow().progress
    }

    pub(crate) fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub(crate) fn view(&self) -> TaskView {
        let status = *self.status.borrow();
        TaskView {
            id: self.id.clone(),
            name: self.name.clone(),
            user: self.user.clone(),
            state: status.state,
            progress: status.progress,
            created_at: self.created_at,
        }
    }

    /// Raise the progress of a RUNNING task; lower values and NaN are ignored
    pub(crate) fn set_progress(&self, progress: f64) {
        if progress.is_nan() {
            return;
        }
        let progress = progress.min(RUNNING_PROGRESS_CEILING);
        self.status.send_if_modified(|status| {
            if status.state == TaskState::Running && progress > status.progress {
                status.progress = progress;
                true
            } else {
                false
            }
        });
    }

    /// CREATED → RUNNING. False when the task was cancelled before starting.
    pub(crate) fn try_start(&self) -> bool {
        self.status.send_if_modified(|status| {
            if status.state == TaskState::Created {
                status.state = TaskState::Running;
                true
            } else {
                false
            }
        })
    }

    /// Request cancellation. A task that has not started yet is CANCELLED
    /// immediately; a running one stops at its next check. False when the
    /// task had already finished or cancellation was already requested.
    pub(crate) fn cancel(&self) -> bool {
        if self.state().is_terminal() {
            return false;
        }
        let requested = self.cancel.cancel();
        let cancelled_before_start = self.status.send_if_modified(|status| {
            if status.state == TaskState::Created {
                status.state = TaskState::Cancelled;
                true
            } else {
                false
            }
        });
        if cancelled_before_start {
            *self.outcome.lock() = Some(TaskOutcome::Cancelled);
        }
        requested || cancelled_before_start
    }

    /// Record the outcome of the work and move to the matching terminal state
    pub(crate) fn finish(&self, outcome: TaskOutcome) -> TaskState {
        let outcome = if self.cancel.is_cancelled() {
            TaskOutcome::Cancelled
        } else {
            outcome
        };
        let target = match &outcome {
            TaskOutcome::Value(_) => TaskState::Done,
            TaskOutcome::Failed(_) => TaskState::Error,
            TaskOutcome::Cancelled => TaskState::Cancelled,
        };

        *self.outcome.lock() = Some(outcome);
        self.status.send_if_modified(|status| {
            if status.state.is_terminal() {
                false
            } else {
                status.state = target;
                if target == TaskState::Done {
                    status.progress = 1.0;
                }
                true
            }
        });
        self.state()
    }

    /// Resolve once the task is in a terminal state
    pub(crate) async fn wait_terminal(&self) -> TaskState {
        let mut receiver = self.status.subscribe();
        let terminal = match receiver.wait_for(|status| status.state.is_terminal()).await {
            Ok(status) => Some(status.state),
            Err(_) => None,
        };
        terminal.unwrap_or_else(|| self.state())
    }

    /// Outcome of a terminal task as a result value
    pub(crate) fn result(&self) -> Result<Option<TaskPayload>, TaskError> {
        match self.outcome.lock().clone() {
            Some(TaskOutcome::Value(payload)) => Ok(payload),
            Some(TaskOutcome::Failed(message)) => Err(TaskError::Failed {
                id: self.id.clone(),
                message,
            }),
            Some(TaskOutcome::Cancelled) | None => Err(TaskError::Cancelled(self.id.clone())),
        }
    }
}
