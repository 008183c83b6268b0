use thiserror::Error;

use super::task::TaskId;
use crate::models::User;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("User {user} is not allowed to access task {id}")]
    Forbidden { id: TaskId, user: User },

    #[error("Task already registered: {0}")]
    AlreadyRegistered(TaskId),

    #[error("Task {id} failed: {message}")]
    Failed { id: TaskId, message: String },

    #[error("Task {0} was cancelled")]
    Cancelled(TaskId),

    #[error("Task manager is shutting down")]
    ShuttingDown,
}

impl TaskError {
    /// HTTP status reported for this error by the task endpoints
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Forbidden { .. } => 403,
            Self::AlreadyRegistered(_) => 409,
            Self::Failed { .. } => 500,
            Self::Cancelled(_) => 410,
            Self::ShuttingDown => 503,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let id = TaskId::from("t");
        assert_eq!(TaskError::NotFound(id.clone()).status_code(), 404);
        assert_eq!(
            TaskError::Forbidden {
                id: id.clone(),
                user: User::new("foo")
            }
            .status_code(),
            403
        );
        assert_eq!(TaskError::AlreadyRegistered(id.clone()).status_code(), 409);
        assert_eq!(TaskError::Cancelled(id).status_code(), 410);
        assert_eq!(TaskError::ShuttingDown.status_code(), 503);
    }
}
