//! Status and body of task lookups as exposed by the task endpoints.

use serde_json::json;

use super::entry::TaskView;
use super::errors::TaskError;
use super::task::TaskPayload;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskResponse {
    pub status: u16,
    pub body: Option<TaskPayload>,
}

impl TaskResponse {
    fn error(error: &TaskError) -> Self {
        Self {
            status: error.status_code(),
            body: Some(TaskPayload::Json(error_body(error))),
        }
    }
}

pub fn error_body(error: &TaskError) -> serde_json::Value {
    json!({ "error": error.to_string() })
}

/// 200 with the payload, 204 when the task produced nothing, or the error status
pub fn task_result_response(result: Result<Option<TaskPayload>, TaskError>) -> TaskResponse {
    match result {
        Ok(Some(payload)) => TaskResponse {
            status: 200,
            body: Some(payload),
        },
        Ok(None) => TaskResponse {
            status: 204,
            body: None,
        },
        Err(error) => TaskResponse::error(&error),
    }
}

/// 200 with the task view as JSON, or the error status
pub fn task_view_response(view: Result<TaskView, TaskError>) -> TaskResponse {
    match view.map(|view| serde_json::to_value(&view)) {
        Ok(Ok(value)) => TaskResponse {
            status: 200,
            body: Some(TaskPayload::Json(value)),
        },
        Ok(Err(e)) => TaskResponse {
            status: 500,
            body: Some(TaskPayload::Json(json!({ "error": e.to_string() }))),
        },
        Err(error) => TaskResponse::error(&error),
    }
}
