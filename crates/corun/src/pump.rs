//! Drivers for cooperative operations outside the scheduler
//!
//! [`sync_wait`] pumps an operation to completion on the calling thread and
//! [`parallel_group`] turns several operations into one that advances all of
//! them on every step.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::{maybe_done, MaybeDone};
use futures::task::noop_waker_ref;
use tracing::{trace, warn};

use crate::error::TimeoutError;

/// Advance `operation` step after step on the calling thread until it
/// finishes, returning its output.
///
/// No scheduler is involved, so other cooperative tasks do not make
/// progress while this runs.
pub fn sync_wait<F: Future>(operation: F) -> F::Output {
    let mut operation = std::pin::pin!(operation);
    let mut cx = Context::from_waker(noop_waker_ref());
    let mut steps = 0usize;
    loop {
        if let Poll::Ready(output) = operation.as_mut().poll(&mut cx) {
            trace!(steps, "Synchronous wait finished");
            return output;
        }
        steps += 1;
        std::thread::yield_now();
    }
}

/// Like [`sync_wait`], but gives up once `timeout` has elapsed.
///
/// The operation is dropped unfinished when the deadline passes.
pub fn sync_wait_with_timeout<F: Future>(
    operation: F,
    timeout: Duration,
) -> Result<F::Output, TimeoutError> {
    let deadline = Instant::now() + timeout;
    let mut operation = std::pin::pin!(operation);
    let mut cx = Context::from_waker(noop_waker_ref());
    loop {
        if let Poll::Ready(output) = operation.as_mut().poll(&mut cx) {
            return Ok(output);
        }
        if Instant::now() >= deadline {
            warn!(?timeout, "Synchronous wait timed out");
            return Err(TimeoutError { duration: timeout });
        }
        std::thread::yield_now();
    }
}

/// Combine `operations` into one operation that advances every unfinished
/// member once per step.
///
/// The group finishes when all members have, yielding their outputs in the
/// order the members were given.
pub fn parallel_group<I>(operations: I) -> ParallelGroup<I::Item>
where
    I: IntoIterator,
    I::Item: Future,
{
    ParallelGroup {
        members: operations
            .into_iter()
            .map(|operation| Box::pin(maybe_done(operation)))
            .collect(),
    }
}

/// Future returned by [`parallel_group`]
#[must_use = "futures do nothing unless awaited"]
pub struct ParallelGroup<F: Future> {
    members: Vec<Pin<Box<MaybeDone<F>>>>,
}

impl<F: Future> ParallelGroup<F> {
    /// Number of operations in the group
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<F: Future> Future for ParallelGroup<F> {
    type Output = Vec<F::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut all_done = true;
        for member in self.members.iter_mut() {
            if member.as_mut().poll(cx).is_pending() {
                all_done = false;
            }
        }

        if !all_done {
            return Poll::Pending;
        }

        let outputs = self
            .members
            .iter_mut()
            .filter_map(|member| member.as_mut().take_output())
            .collect();
        self.members.clear();
        Poll::Ready(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::yield_now;
    use std::cell::RefCell;
    use std::rc::Rc;

    async fn steps(count: usize, name: &'static str, log: Rc<RefCell<Vec<&'static str>>>) -> usize {
        for _ in 0..count {
            log.borrow_mut().push(name);
            yield_now().await;
        }
        count
    }

    #[test]
    fn test_sync_wait_returns_output() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let output = sync_wait(steps(3, "a", log.clone()));
        assert_eq!(output, 3);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn test_sync_wait_with_timeout_finishes() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let output = sync_wait_with_timeout(steps(2, "a", log), Duration::from_secs(5));
        assert_eq!(output, Ok(2));
    }

    #[test]
    fn test_sync_wait_with_timeout_expires() {
        let never = futures::future::pending::<()>();
        let err = sync_wait_with_timeout(never, Duration::from_millis(10)).unwrap_err();
        assert_eq!(err.duration, Duration::from_millis(10));
    }

    #[test]
    fn test_parallel_group_interleaves_members() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let group = parallel_group(vec![
            Box::pin(steps(1, "a", log.clone())) as Pin<Box<dyn Future<Output = usize>>>,
            Box::pin(steps(3, "b", log.clone())),
            Box::pin(steps(2, "c", log.clone())),
        ]);
        assert_eq!(group.len(), 3);

        let outputs = sync_wait(group);
        assert_eq!(outputs, vec![1, 3, 2]);
        assert_eq!(*log.borrow(), vec!["a", "b", "c", "b", "c", "b"]);
    }

    #[test]
    fn test_empty_parallel_group_finishes_immediately() {
        let group = parallel_group(Vec::<futures::future::Ready<()>>::new());
        assert!(group.is_empty());
        assert!(sync_wait(group).is_empty());
    }

    #[test]
    fn test_parallel_group_under_scheduler() {
        use crate::{Scheduler, TaskOptions};

        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let group = parallel_group(vec![steps(2, "x", log.clone()), steps(2, "y", log.clone())]);
        let handle = scheduler.submit(
            async move { Ok(group.await.into_iter().sum::<usize>()) },
            TaskOptions::blocking("Resolving"),
        );

        scheduler.tick().unwrap();
        assert_eq!(*log.borrow(), vec!["x", "y"]);
        scheduler.tick().unwrap();
        scheduler.tick().unwrap();
        assert!(!scheduler.is_running());
        assert_eq!(sync_wait(handle), Ok(4));
    }
}
