//! Observer hooks for scheduler activity
//!
//! A host UI implements [`SchedulerReporter`] to learn when a blocking load
//! starts or ends and when a task failure was recovered by its handler.

use crate::error::TaskError;
use crate::task::TaskId;

/// Trait for observing scheduler activity
pub trait SchedulerReporter {
    /// A blocking task was submitted while nothing was blocking
    fn on_blocking_started(&mut self) {}

    /// The last blocking task left the scheduler
    fn on_blocking_completed(&mut self) {}

    /// A task failed and its failure handler is about to receive the error
    fn on_task_failed(&mut self, task_id: TaskId, status_title: Option<&str>, error: &TaskError) {
        let _ = (task_id, status_title, error);
    }
}

/// A no-op reporter that discards all events
#[derive(Debug, Default)]
pub struct NoOpReporter;

impl SchedulerReporter for NoOpReporter {}

/// A multi-reporter that broadcasts events to multiple reporters
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn SchedulerReporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn add_reporter<R: SchedulerReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl SchedulerReporter for MultiReporter {
    fn on_blocking_started(&mut self) {
        for reporter in &mut self.reporters {
            reporter.on_blocking_started();
        }
    }

    fn on_blocking_completed(&mut self) {
        for reporter in &mut self.reporters {
            reporter.on_blocking_completed();
        }
    }

    fn on_task_failed(&mut self, task_id: TaskId, status_title: Option<&str>, error: &TaskError) {
        for reporter in &mut self.reporters {
            reporter.on_task_failed(task_id, status_title, error);
        }
    }
}
