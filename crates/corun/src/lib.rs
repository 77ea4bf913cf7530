//! Corun - Frame-Driven Cooperative Scheduler
//!
//! Multiplexes many long-running operations onto one logical thread of
//! control. Nothing here runs in parallel: a host calls
//! [`Scheduler::tick`] once per frame and every active task is advanced by
//! exactly one step.
//!
//! # Overview
//!
//! - A [`CooperativeTask`] wraps a single future and polls it once per step.
//!   The future suspends at [`yield_now`] or at any other pending await.
//! - The [`Scheduler`] keeps submitted tasks pending until the next tick, so
//!   work submitted by a running task never runs in the tick that created it.
//! - A task marked blocking feeds [`Scheduler::is_blocking`] and
//!   [`Scheduler::status_text`], which a UI polls to show what it waits on.
//! - Failures are routed to the task's failure handler or surfaced from
//!   [`Scheduler::tick`] once every other task had its step.
//!
//! # Example
//!
//! ```rust
//! use corun::{yield_now, Scheduler, TaskOptions};
//!
//! let scheduler = Scheduler::new();
//! let handle = scheduler.submit(
//!     async {
//!         yield_now().await;
//!         Ok(42)
//!     },
//!     TaskOptions::blocking("Answering"),
//! );
//!
//! assert!(scheduler.is_blocking());
//! while scheduler.is_running() {
//!     scheduler.tick().unwrap();
//! }
//! assert_eq!(corun::sync_wait(handle), Ok(42));
//! ```

pub mod error;
pub mod pump;
pub mod reporter;
pub mod scheduler;
pub mod task;

pub use error::{SchedulerError, SchedulerResult, TaskAborted, TaskError, TaskFailure, TimeoutError};
pub use pump::{parallel_group, sync_wait, sync_wait_with_timeout, ParallelGroup};
pub use reporter::{MultiReporter, NoOpReporter, SchedulerReporter};
pub use scheduler::Scheduler;
pub use task::{yield_now, CooperativeTask, FailureHandler, TaskHandle, TaskId, TaskOptions, YieldNow};
