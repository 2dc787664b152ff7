use std::time::Duration;

use thiserror::Error;

use crate::model::TaskId;

/// A required field was missing before any request was issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Failure talking to a remote collaborator. Cloneable so it can travel back to
/// the UI loop inside a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("network failure: {0}")]
    Network(String),
    #[error("task {0} was not found")]
    NotFound(TaskId),
    #[error("session is not authorized, log in again")]
    Unauthorized,
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl RequestError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RequestError::Unauthorized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Request(#[from] RequestError),
}

impl TaskError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, TaskError::Request(err) if err.is_unauthorized())
    }
}
