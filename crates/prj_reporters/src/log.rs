use std::collections::HashMap;

use command_dispatcher::{CommandId, CommandReporter};
use corun::{SchedulerReporter, TaskError, TaskId};

/// Logs command activity through `tracing`.
#[derive(Debug, Default)]
pub struct TracingCommandReporter {
    next_id: usize,
    labels: HashMap<CommandId, String>,
}

impl TracingCommandReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn label(&self, id: CommandId) -> &str {
        self.labels.get(&id).map(String::as_str).unwrap_or("<unknown>")
    }
}

impl CommandReporter for TracingCommandReporter {
    fn on_started(&mut self, label: &str) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id += 1;
        self.labels.insert(id, label.to_string());
        tracing::info!(command = label, "started");
        id
    }

    fn on_output(&mut self, id: CommandId, line: &str) {
        tracing::trace!(command = self.label(id), "{line}");
    }

    fn on_finished(&mut self, id: CommandId, result: Result<(), &str>) {
        match result {
            Ok(()) => tracing::info!(command = self.label(id), "finished"),
            Err(message) => tracing::error!(command = self.label(id), "failed: {message}"),
        }
        self.labels.remove(&id);
    }
}

/// Logs blocking transitions and handled task failures through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSchedulerReporter;

impl SchedulerReporter for TracingSchedulerReporter {
    fn on_blocking_started(&mut self) {
        tracing::debug!("blocking work started");
    }

    fn on_blocking_completed(&mut self) {
        tracing::debug!("blocking work completed");
    }

    fn on_task_failed(&mut self, task_id: TaskId, status_title: Option<&str>, error: &TaskError) {
        tracing::warn!(%task_id, status_title, "task failed: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_released_on_finish() {
        let mut reporter = TracingCommandReporter::new();
        let install = reporter.on_started("Installing");
        let remove = reporter.on_started("Removing");
        assert_ne!(install, remove);
        assert_eq!(reporter.label(install), "Installing");

        reporter.on_output(install, "fetching numpy");
        reporter.on_finished(install, Err("exit code 1"));
        assert_eq!(reporter.label(install), "<unknown>");
        assert_eq!(reporter.label(remove), "Removing");
    }
}
