//! The values a command operation yields to the orchestrator.

use futures::{Stream, StreamExt};

/// One value yielded by a command operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent<T> {
    /// Output lines produced since the previous event, possibly none.
    Progress(Vec<String>),

    /// The final value of the operation. Nothing may follow it.
    Response(CommandResponse<T>),
}

/// The terminal response of a command operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResponse<T> {
    Succeeded(T),
    Failed(String),
}

impl<T> CommandEvent<T> {
    /// A progress event carrying `lines`
    pub fn progress<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        CommandEvent::Progress(lines.into_iter().map(Into::into).collect())
    }

    /// A progress event without output
    pub fn idle() -> Self {
        CommandEvent::Progress(Vec::new())
    }

    pub fn succeeded(payload: T) -> Self {
        CommandEvent::Response(CommandResponse::Succeeded(payload))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        CommandEvent::Response(CommandResponse::Failed(message.into()))
    }

    pub fn is_response(&self) -> bool {
        matches!(self, CommandEvent::Response(_))
    }
}

impl<T> CommandResponse<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResponse::Succeeded(_))
    }

    /// The error message of a failed response
    pub fn error_message(&self) -> Option<&str> {
        match self {
            CommandResponse::Succeeded(_) => None,
            CommandResponse::Failed(message) => Some(message),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            CommandResponse::Succeeded(payload) => Ok(payload),
            CommandResponse::Failed(message) => Err(message),
        }
    }
}

/// Convert the success payload of `operation` with `convert`.
///
/// Progress and failures pass through unchanged. A conversion error turns
/// the terminal response into a failure carrying the error text.
pub fn map_payload<S, T, U, F>(operation: S, mut convert: F) -> impl Stream<Item = CommandEvent<U>>
where
    S: Stream<Item = CommandEvent<T>>,
    F: FnMut(T) -> Result<U, String>,
{
    operation.map(move |event| match event {
        CommandEvent::Progress(lines) => CommandEvent::Progress(lines),
        CommandEvent::Response(CommandResponse::Succeeded(payload)) => match convert(payload) {
            Ok(value) => CommandEvent::succeeded(value),
            Err(message) => CommandEvent::failed(message),
        },
        CommandEvent::Response(CommandResponse::Failed(message)) => CommandEvent::failed(message),
    })
}
