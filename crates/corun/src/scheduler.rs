//! Frame-driven scheduler for cooperative tasks

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::error::{SchedulerError, SchedulerResult, TaskError, TaskFailure};
use crate::reporter::{NoOpReporter, SchedulerReporter};
use crate::task::{CooperativeTask, TaskHandle, TaskOptions};

/// Multiplexes cooperative tasks onto the thread that calls [`tick`].
///
/// Submitted tasks wait in a pending set until the next tick promotes them,
/// so a task submitted while another one is being advanced never runs in the
/// same tick. Cloning a `Scheduler` yields another handle to the same task
/// sets, which is how tasks submit follow-up work.
///
/// [`tick`]: Scheduler::tick
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

struct SchedulerInner {
    pending: RefCell<Vec<Rc<CooperativeTask>>>,
    active: RefCell<Vec<Rc<CooperativeTask>>>,
    reporter: RefCell<Box<dyn SchedulerReporter>>,
    /// Blocking transitions not yet delivered to the reporter
    queued_events: RefCell<VecDeque<BlockingEvent>>,
    was_blocking: Cell<bool>,
    ticking: Cell<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockingEvent {
    Started,
    Completed,
}

impl Default for SchedulerInner {
    fn default() -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
            active: RefCell::new(Vec::new()),
            reporter: RefCell::new(Box::new(NoOpReporter)),
            queued_events: RefCell::new(VecDeque::new()),
            was_blocking: Cell::new(false),
            ticking: Cell::new(false),
        }
    }
}

impl Scheduler {
    /// Create a new scheduler with no reporter
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new scheduler that reports blocking and failure events
    pub fn with_reporter(reporter: impl SchedulerReporter + 'static) -> Self {
        let scheduler = Self::new();
        *scheduler.inner.reporter.borrow_mut() = Box::new(reporter);
        scheduler
    }

    /// Register `operation`. It is first advanced on the tick after this
    /// call, even when called from inside a running task.
    pub fn submit<F, T>(&self, operation: F, options: TaskOptions) -> TaskHandle<T>
    where
        F: Future<Output = Result<T, TaskError>> + 'static,
        T: 'static,
    {
        if options.is_blocking && !self.inner.was_blocking.replace(true) {
            self.notify(BlockingEvent::Started);
        }

        let (task, handle) = TaskHandle::wrap(operation, options);
        debug!(
            task_id = %task.id(),
            status_title = task.status_title(),
            blocking = task.is_blocking(),
            "Task submitted"
        );
        self.inner.pending.borrow_mut().push(task);
        handle
    }

    /// Advance every active task by one step.
    ///
    /// Tasks run in submission order. A failure with a handler is recovered
    /// locally; failures without one are collected and returned after every
    /// other task has had its step.
    pub fn tick(&self) -> SchedulerResult<()> {
        let _ticking = TickGuard::enter(&self.inner.ticking);

        self.promote_pending();

        if self.inner.active.borrow().is_empty() {
            return Ok(());
        }

        // Iterate over a snapshot so tasks can query and submit while we advance.
        let snapshot: Vec<Rc<CooperativeTask>> = self.inner.active.borrow().clone();
        let mut unhandled = Vec::new();

        for task in &snapshot {
            if let Err(err) = task.advance() {
                self.on_task_error(task, err, &mut unhandled);
            }
        }

        self.inner
            .active
            .borrow_mut()
            .retain(|task| !task.is_finished());

        // Tasks submitted during this pass become eligible next tick.
        self.promote_pending();

        if self.inner.was_blocking.get() && !self.is_blocking() {
            self.inner.was_blocking.set(false);
            self.notify(BlockingEvent::Completed);
        }

        if unhandled.is_empty() {
            Ok(())
        } else {
            Err(SchedulerError::unhandled(unhandled))
        }
    }

    /// Tick once per `frame_period` until no task is pending or active
    pub async fn run_until_idle(&self, frame_period: Duration) -> SchedulerResult<()> {
        let mut frames = tokio::time::interval(frame_period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.is_running() {
            frames.tick().await;
            self.tick()?;
        }
        Ok(())
    }

    /// True iff an active or pending task has its blocking flag set
    pub fn is_blocking(&self) -> bool {
        let is_live_blocking = |task: &Rc<CooperativeTask>| task.is_blocking() && !task.is_finished();
        self.inner.active.borrow().iter().any(is_live_blocking)
            || self.inner.pending.borrow().iter().any(is_live_blocking)
    }

    /// The status title of the last active blocking task, `None` if that
    /// task has no title
    pub fn status_text(&self) -> Option<String> {
        self.inner
            .active
            .borrow()
            .iter()
            .rev()
            .find(|task| task.is_blocking() && !task.is_finished())
            .and_then(|task| task.status_title().map(str::to_string))
    }

    /// True iff any task is active or pending
    pub fn is_running(&self) -> bool {
        !self.inner.active.borrow().is_empty() || !self.inner.pending.borrow().is_empty()
    }

    /// Number of tasks currently being advanced each tick
    pub fn active_count(&self) -> usize {
        self.inner.active.borrow().len()
    }

    /// Number of tasks waiting for the next tick
    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Deliver `event` to the reporter in order with earlier ones.
    ///
    /// A reporter callback may submit work. Events raised from inside a
    /// callback are queued and delivered by the outer call once it returns.
    fn notify(&self, event: BlockingEvent) {
        self.inner.queued_events.borrow_mut().push_back(event);
        self.deliver_queued_events();
    }

    fn deliver_queued_events(&self) {
        let Ok(mut reporter) = self.inner.reporter.try_borrow_mut() else {
            return;
        };
        loop {
            let next = self.inner.queued_events.borrow_mut().pop_front();
            match next {
                Some(BlockingEvent::Started) => reporter.on_blocking_started(),
                Some(BlockingEvent::Completed) => reporter.on_blocking_completed(),
                None => break,
            }
        }
    }

    fn promote_pending(&self) {
        let promoted = std::mem::take(&mut *self.inner.pending.borrow_mut());
        self.inner.active.borrow_mut().extend(promoted);
    }

    fn on_task_error(
        &self,
        task: &CooperativeTask,
        err: TaskError,
        unhandled: &mut Vec<TaskFailure>,
    ) {
        match task.take_failure_handler() {
            Some(handler) => {
                warn!(
                    task_id = %task.id(),
                    status_title = task.status_title(),
                    error = %err,
                    "Task failed, invoking failure handler"
                );
                self.inner
                    .reporter
                    .borrow_mut()
                    .on_task_failed(task.id(), task.status_title(), &err);
                self.deliver_queued_events();
                handler(err);
            }
            None => {
                error!(
                    task_id = %task.id(),
                    status_title = task.status_title(),
                    error = %err,
                    "Task failed without a failure handler"
                );
                unhandled.push(TaskFailure::new(
                    task.id(),
                    task.status_title().map(str::to_string),
                    err,
                ));
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &*self.inner.pending.borrow())
            .field("active", &*self.inner.active.borrow())
            .finish()
    }
}

/// Marks the scheduler as ticking; ticks never nest.
struct TickGuard<'a> {
    ticking: &'a Cell<bool>,
}

impl<'a> TickGuard<'a> {
    fn enter(ticking: &'a Cell<bool>) -> Self {
        assert!(
            !ticking.replace(true),
            "Scheduler::tick must not be called from inside a task"
        );
        Self { ticking }
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.ticking.set(false);
    }
}
