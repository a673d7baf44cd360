use thiserror::Error;

use crate::domain::{TaskId, TaskStatus};
use crate::ports::GenerateError;

#[derive(Debug, Error)]
pub enum Error {
    /// Admission error: the request is malformed or inconsistent.
    #[error("invalid task: {0}")]
    Validation(String),

    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The requested status change is not valid for the task's current status.
    #[error("task {id} is {current}, cannot move to {requested}")]
    Conflict {
        id: TaskId,
        current: TaskStatus,
        requested: TaskStatus,
    },

    #[error("task {id} is {status}; results are available once it is complete")]
    ResultsUnavailable { id: TaskId, status: TaskStatus },

    #[error("generation failed")]
    Generate(#[from] GenerateError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("worker pool is shut down")]
    PoolClosed,

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
