//! Cooperative task primitives
//!
//! A [`CooperativeTask`] wraps exactly one suspendable operation (a future
//! polled once per step) together with the metadata the scheduler needs to
//! surface it: a status title, a blocking flag and an optional failure
//! handler.

use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Display};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::noop_waker_ref;
use uuid::Uuid;

use crate::error::{TaskAborted, TaskError};

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new unique task ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Called with the error of a failed task instead of surfacing it from
/// [`Scheduler::tick`](crate::Scheduler::tick).
pub type FailureHandler = Box<dyn FnOnce(TaskError)>;

/// How a submitted task is surfaced to the user
pub struct TaskOptions {
    /// Human readable status shown while the task blocks
    pub status_title: Option<String>,
    /// Whether the task is an authoritative "operation in progress"
    pub is_blocking: bool,
    /// Recovers failures locally; without one a failure is fatal to the tick
    pub on_failure: Option<FailureHandler>,
}

impl TaskOptions {
    /// A blocking task shown with the given status title
    pub fn blocking(status_title: impl Into<String>) -> Self {
        Self {
            status_title: Some(status_title.into()),
            is_blocking: true,
            on_failure: None,
        }
    }

    /// A task that never contributes to the blocking status
    pub fn background() -> Self {
        Self {
            status_title: None,
            is_blocking: false,
            on_failure: None,
        }
    }

    /// Set the status title
    pub fn with_status_title(mut self, status_title: impl Into<String>) -> Self {
        self.status_title = Some(status_title.into());
        self
    }

    /// Route failures of this task to `handler`
    pub fn with_failure_handler(mut self, handler: impl FnOnce(TaskError) + 'static) -> Self {
        self.on_failure = Some(Box::new(handler));
        self
    }
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            status_title: None,
            is_blocking: true,
            on_failure: None,
        }
    }
}

impl Debug for TaskOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOptions")
            .field("status_title", &self.status_title)
            .field("is_blocking", &self.is_blocking)
            .field("on_failure", &self.on_failure.is_some())
            .finish()
    }
}

/// A unit of suspendable work advanced one step at a time
pub struct CooperativeTask {
    id: TaskId,
    status_title: Option<String>,
    is_blocking: bool,
    finished: Cell<bool>,
    operation: RefCell<Option<LocalBoxFuture<'static, Result<(), TaskError>>>>,
    on_failure: RefCell<Option<FailureHandler>>,
    waiter: RefCell<Option<Waker>>,
}

impl CooperativeTask {
    /// Wrap `operation` into a task described by `options`
    pub fn new<F>(operation: F, options: TaskOptions) -> Self
    where
        F: Future<Output = Result<(), TaskError>> + 'static,
    {
        Self {
            id: TaskId::new(),
            status_title: options.status_title,
            is_blocking: options.is_blocking,
            finished: Cell::new(false),
            operation: RefCell::new(Some(operation.boxed_local())),
            on_failure: RefCell::new(options.on_failure),
            waiter: RefCell::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn status_title(&self) -> Option<&str> {
        self.status_title.as_deref()
    }

    pub fn is_blocking(&self) -> bool {
        self.is_blocking
    }

    /// True once the operation has no more steps, by completion or failure
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }

    /// Drive the operation forward exactly one suspension point.
    ///
    /// Calling this after the task finished is a no-op. A failure of the
    /// operation finishes the task and is returned to the caller.
    pub fn advance(&self) -> Result<(), TaskError> {
        if self.is_finished() {
            return Ok(());
        }

        let Some(mut operation) = self.operation.borrow_mut().take() else {
            return Ok(());
        };

        let mut cx = Context::from_waker(noop_waker_ref());
        match operation.poll_unpin(&mut cx) {
            Poll::Pending => {
                *self.operation.borrow_mut() = Some(operation);
                Ok(())
            }
            Poll::Ready(result) => {
                // Drop the finished operation before anyone observes the flag.
                drop(operation);
                self.finish();
                result
            }
        }
    }

    pub(crate) fn take_failure_handler(&self) -> Option<FailureHandler> {
        self.on_failure.borrow_mut().take()
    }

    fn finish(&self) {
        self.finished.set(true);
        if let Some(waker) = self.waiter.borrow_mut().take() {
            waker.wake();
        }
    }

    fn register_waiter(&self, waker: &Waker) {
        let mut waiter = self.waiter.borrow_mut();
        match waiter.as_ref() {
            Some(existing) if existing.will_wake(waker) => {}
            _ => *waiter = Some(waker.clone()),
        }
    }
}

impl Debug for CooperativeTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CooperativeTask")
            .field("id", &self.id)
            .field("status_title", &self.status_title)
            .field("is_blocking", &self.is_blocking)
            .field("finished", &self.finished.get())
            .finish()
    }
}

/// Resolves once the submitted task finishes.
///
/// Yields the task's value, or [`TaskAborted`] when the task failed. The
/// handle can be awaited from another cooperative task or from any
/// waker-driven executor.
pub struct TaskHandle<T> {
    task: Rc<CooperativeTask>,
    output: Rc<RefCell<Option<T>>>,
}

impl<T: 'static> TaskHandle<T> {
    /// Wrap `operation` so its value lands in the returned handle
    pub(crate) fn wrap<F>(operation: F, options: TaskOptions) -> (Rc<CooperativeTask>, Self)
    where
        F: Future<Output = Result<T, TaskError>> + 'static,
    {
        let output = Rc::new(RefCell::new(None));
        let slot = output.clone();
        let erased = async move {
            let value = operation.await?;
            *slot.borrow_mut() = Some(value);
            Ok(())
        };

        let task = Rc::new(CooperativeTask::new(erased, options));
        let handle = Self {
            task: task.clone(),
            output,
        };
        (task, handle)
    }
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskAborted>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(value) = self.output.borrow_mut().take() {
            return Poll::Ready(Ok(value));
        }

        if self.task.is_finished() {
            return Poll::Ready(Err(TaskAborted {
                task_id: self.task.id(),
                status_title: self.task.status_title.clone(),
            }));
        }

        self.task.register_waiter(cx.waker());
        Poll::Pending
    }
}

impl<T> Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle").field("task", &self.task).finish()
    }
}

/// Suspend the current operation until its next step
pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Future returned by [`yield_now`]
#[derive(Debug)]
#[must_use = "futures do nothing unless awaited"]
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_task(steps: usize, counter: Rc<Cell<usize>>) -> CooperativeTask {
        CooperativeTask::new(
            async move {
                for _ in 0..steps {
                    counter.set(counter.get() + 1);
                    yield_now().await;
                }
                Ok(())
            },
            TaskOptions::blocking("Counting"),
        )
    }

    #[test]
    fn test_task_id_generation() {
        let id1 = TaskId::new();
        let id2 = TaskId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_advance_one_step_at_a_time() {
        let counter = Rc::new(Cell::new(0));
        let task = counting_task(2, counter.clone());

        task.advance().unwrap();
        assert_eq!(counter.get(), 1);
        assert!(!task.is_finished());

        task.advance().unwrap();
        assert_eq!(counter.get(), 2);
        assert!(!task.is_finished());

        task.advance().unwrap();
        assert!(task.is_finished());
    }

    #[test]
    fn test_advance_after_finish_is_noop() {
        let counter = Rc::new(Cell::new(0));
        let task = counting_task(0, counter.clone());

        task.advance().unwrap();
        assert!(task.is_finished());

        task.advance().unwrap();
        task.advance().unwrap();
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_failure_finishes_task() {
        let task = CooperativeTask::new(
            async {
                yield_now().await;
                Err::<(), TaskError>("broken pipe".into())
            },
            TaskOptions::default(),
        );

        assert!(task.advance().is_ok());
        let error = task.advance().unwrap_err();
        assert_eq!(error.to_string(), "broken pipe");
        assert!(task.is_finished());
        assert!(task.advance().is_ok());
    }

    #[test]
    fn test_handle_receives_value() {
        let (task, handle) = TaskHandle::wrap(
            async {
                yield_now().await;
                Ok(42)
            },
            TaskOptions::background(),
        );

        let mut handle = handle;
        let mut cx = Context::from_waker(noop_waker_ref());
        assert!(Pin::new(&mut handle).poll(&mut cx).is_pending());

        task.advance().unwrap();
        task.advance().unwrap();
        assert!(handle.is_finished());
        assert_eq!(Pin::new(&mut handle).poll(&mut cx), Poll::Ready(Ok(42)));
    }

    #[test]
    fn test_handle_reports_abort() {
        let (task, mut handle) = TaskHandle::<u32>::wrap(
            async { Err("nope".into()) },
            TaskOptions::blocking("Installing"),
        );

        assert!(task.advance().is_err());

        let mut cx = Context::from_waker(noop_waker_ref());
        match Pin::new(&mut handle).poll(&mut cx) {
            Poll::Ready(Err(aborted)) => {
                assert_eq!(aborted.status_title.as_deref(), Some("Installing"));
                assert_eq!(aborted.task_id, task.id());
            }
            other => panic!("expected an aborted handle, got {other:?}"),
        }
    }

    #[test]
    fn test_options_debug_hides_handler() {
        let options = TaskOptions::background().with_failure_handler(|_| {});
        let rendered = format!("{options:?}");
        assert!(rendered.contains("on_failure: true"));
        assert!(!options.is_blocking);
    }
}
