use thiserror::Error;

/// An error returned to the caller of an orchestrated command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command reported a failed terminal response.
    #[error("{message}")]
    Failed { message: String },

    /// Another command of the same orchestrator is still outstanding.
    #[error("cannot start a command while '{current}' is still running")]
    Busy { current: String },

    /// The task driving the command went away before it produced a response.
    #[error("the task running '{label}' was aborted")]
    Aborted { label: String },
}

impl CommandError {
    pub fn failed(message: impl Into<String>) -> Self {
        CommandError::Failed {
            message: message.into(),
        }
    }

    pub fn busy(current: impl Into<String>) -> Self {
        CommandError::Busy {
            current: current.into(),
        }
    }

    pub fn aborted(label: impl Into<String>) -> Self {
        CommandError::Aborted {
            label: label.into(),
        }
    }

    /// True if the command itself ran and reported a failure.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, CommandError::Failed { .. })
    }
}
