//! External command executor backed by a child process.
//!
//! [`ProcessCommand`] spawns the configured program and exposes it as a
//! command operation: stdout lines become progress events and the exit
//! status together with the collected stderr becomes the terminal response.

mod config;
mod output;
mod process;

pub use config::{CommandConfig, ConfigError, ConfigResult};
pub use output::split_documents;
pub use process::{ProcessCommand, ProcessOperation};
