//! Command orchestration on top of the cooperative scheduler.
//!
//! A command operation is a [`futures::Stream`] of [`CommandEvent`]s: any
//! number of progress events followed by exactly one terminal
//! [`CommandResponse`]. The [`CommandOrchestrator`] runs such an operation as
//! a blocking task, mirrors its latest output line as status text and turns
//! the terminal response into a typed result.

pub mod error;
pub mod orchestrator;
pub mod protocol;
pub mod refresh;
pub mod reporter;

pub use error::CommandError;
pub use orchestrator::CommandOrchestrator;
pub use protocol::{map_payload, CommandEvent, CommandResponse};
pub use refresh::StateRefresher;
pub use reporter::{CommandId, CommandReporter, NoOpReporter};
