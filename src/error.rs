use std::any::Any;
use thiserror::Error;
use uuid::Uuid;

use crate::queue::QueueError;
use crate::search::SearchError;
use crate::store::StoreError;
use crate::tasks::TaskError;

#[derive(Debug, Error)]
pub enum BatchSearchError {
    #[error("Batch search not found: {0}")]
    BatchSearchNotFound(Uuid),

    #[error("Interrupted while waiting on the job queue: {0}")]
    Interrupted(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Store error: {0}")]
    StoreError(StoreError),

    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    #[error("Queue error: {0}")]
    QueueError(QueueError),

    #[error("Task error: {0}")]
    TaskError(#[from] TaskError),
}

impl BatchSearchError {
    /// Whether the referenced job does not exist. Non-fatal for the consumer loop.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BatchSearchNotFound(_))
    }

    /// Whether the error must terminate the consumer loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Interrupted(_))
    }
}

impl From<StoreError> for BatchSearchError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::BatchSearchNotFound(id) => Self::BatchSearchNotFound(id),
            other => Self::StoreError(other),
        }
    }
}

impl From<QueueError> for BatchSearchError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Interrupted(reason) => Self::Interrupted(reason),
            other => Self::QueueError(other),
        }
    }
}

impl From<::config::ConfigError> for BatchSearchError {
    fn from(error: ::config::ConfigError) -> Self {
        Self::ConfigurationError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BatchSearchError>;

/// Readable message from a caught panic payload
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let id = Uuid::new_v4();
        let error: BatchSearchError = StoreError::BatchSearchNotFound(id).into();
        assert!(error.is_not_found());
        assert!(!error.is_fatal());
        assert_eq!(error.to_string(), format!("Batch search not found: {id}"));
    }

    #[test]
    fn test_queue_interruption_is_fatal() {
        let error: BatchSearchError = QueueError::Interrupted("closed".to_string()).into();
        assert!(error.is_fatal());
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_panic_message() {
        let panic = std::panic::catch_unwind(|| panic!("boom")).unwrap_err();
        assert_eq!(panic_message(panic.as_ref()), "boom");

        let panic = std::panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(panic.as_ref()), "code 7");
    }

    #[test]
    fn test_other_queue_errors_are_not_fatal() {
        let error: BatchSearchError = QueueError::Backend("connection reset".to_string()).into();
        assert!(!error.is_fatal());
    }
}
