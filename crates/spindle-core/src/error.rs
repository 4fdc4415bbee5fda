//! Error types for the scheduler and for unit outcomes

use crate::task::TaskId;

/// Errors returned by scheduler operations
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Shutdown has been requested; no new units are accepted
    #[error("scheduler stopped")]
    Stopped,

    /// The pending-unit limit is reached
    #[error("scheduler at capacity ({limit} pending units)")]
    AtCapacity {
        /// Configured `max_pending`
        limit: usize,
    },

    /// A worker thread could not be created
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Failure outcome of a single unit, observed through its join handle
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The unit panicked while being resumed
    #[error("task {task} panicked: {message}")]
    Panicked {
        /// Failing unit
        task: TaskId,
        /// Panic payload, if it was a string
        message: String,
    },

    /// The unit returned an error
    #[error("task {task} failed: {error:#}")]
    Failed {
        /// Failing unit
        task: TaskId,
        /// Error returned by the unit body
        error: anyhow::Error,
    },

    /// The unit was destroyed before it finished
    #[error("task {task} was destroyed before completion")]
    Abandoned {
        /// Destroyed unit
        task: TaskId,
    },
}

impl TaskError {
    /// Id of the unit this error belongs to
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskError::Panicked { task, .. }
            | TaskError::Failed { task, .. }
            | TaskError::Abandoned { task } => *task,
        }
    }
}

/// Scheduler operation result
pub type Result<T> = std::result::Result<T, SchedulerError>;
