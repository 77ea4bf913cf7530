//! Reporter implementations for the scheduler and the command orchestrator.

mod log;
mod spinner;

pub use log::{TracingCommandReporter, TracingSchedulerReporter};
pub use spinner::StatusSpinnerReporter;
