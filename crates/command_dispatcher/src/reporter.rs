/// Identifies a command for the lifetime of a [`CommandReporter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(pub usize);

/// Observes orchestrated commands.
pub trait CommandReporter {
    /// A command was submitted. The returned id is passed to the other
    /// methods for this command.
    fn on_started(&mut self, label: &str) -> CommandId;

    /// The command produced an output line
    fn on_output(&mut self, id: CommandId, line: &str) {
        let _ = (id, line);
    }

    /// The command reported its terminal response
    fn on_finished(&mut self, id: CommandId, result: Result<(), &str>);
}

/// A reporter that ignores every command
#[derive(Debug, Default)]
pub struct NoOpReporter {
    next_id: usize,
}

impl CommandReporter for NoOpReporter {
    fn on_started(&mut self, _label: &str) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id += 1;
        id
    }

    fn on_finished(&mut self, _id: CommandId, _result: Result<(), &str>) {}
}
