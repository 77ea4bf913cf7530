//! Error types for the cooperative scheduler

use std::time::Duration;

use thiserror::Error;

use crate::task::TaskId;

/// The error a cooperative operation may fail with.
///
/// Any `std::error::Error` converts into this through `?`, so task bodies can
/// propagate whatever their collaborators return.
pub type TaskError = Box<dyn std::error::Error + Send + Sync>;

/// Returned by a [`TaskHandle`](crate::TaskHandle) whose task failed instead
/// of producing a value.
///
/// The failure itself went to the task's failure handler or was surfaced from
/// [`Scheduler::tick`](crate::Scheduler::tick).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("task {} failed before producing a result", display_title(.status_title, .task_id))]
pub struct TaskAborted {
    pub task_id: TaskId,
    pub status_title: Option<String>,
}

/// A single task failure that no failure handler claimed.
#[derive(Error, Debug)]
#[error("error occurred during async operation {}", display_title(.status_title, .task_id))]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub status_title: Option<String>,
    pub source: TaskError,
}

/// Main error type for scheduler operations
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// One or more tasks failed during a tick without a failure handler.
    ///
    /// Every other task was still advanced on that tick; the failed tasks
    /// have already been removed.
    #[error("{} task(s) failed without a failure handler", .failures.len())]
    Unhandled { failures: Vec<TaskFailure> },
}

/// Returned by [`sync_wait_with_timeout`](crate::sync_wait_with_timeout) when
/// the operation is still suspended after the deadline.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation did not finish within {duration:?}")]
pub struct TimeoutError {
    pub duration: Duration,
}

/// Result type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

impl SchedulerError {
    /// Create an aggregate error from the failures collected during one tick
    pub fn unhandled(failures: Vec<TaskFailure>) -> Self {
        SchedulerError::Unhandled { failures }
    }

    /// The individual failures behind this error
    pub fn failures(&self) -> &[TaskFailure] {
        match self {
            SchedulerError::Unhandled { failures } => failures,
        }
    }

    /// Consume the error and return the individual failures
    pub fn into_failures(self) -> Vec<TaskFailure> {
        match self {
            SchedulerError::Unhandled { failures } => failures,
        }
    }
}

impl TaskFailure {
    pub fn new(task_id: TaskId, status_title: Option<String>, source: TaskError) -> Self {
        Self {
            task_id,
            status_title,
            source,
        }
    }
}

fn display_title(status_title: &Option<String>, task_id: &TaskId) -> String {
    match status_title {
        Some(title) => format!("'{title}'"),
        None => task_id.to_string(),
    }
}
