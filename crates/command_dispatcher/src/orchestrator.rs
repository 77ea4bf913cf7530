use std::cell::RefCell;
use std::rc::Rc;
use std::task::Poll;

use corun::{yield_now, Scheduler, TaskError, TaskOptions};
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::error::CommandError;
use crate::protocol::{CommandEvent, CommandResponse};
use crate::refresh::StateRefresher;
use crate::reporter::{CommandId, CommandReporter, NoOpReporter};

/// Runs command operations as blocking tasks on a [`Scheduler`].
///
/// Only one command runs at a time per orchestrator. While it runs,
/// [`blocked_status`](Self::blocked_status) holds the last output line the
/// command produced, or its label before it produced any.
#[derive(Clone)]
pub struct CommandOrchestrator {
    scheduler: Scheduler,
    state: Rc<BlockedState>,
    refresher: Rc<dyn StateRefresher>,
    reporter: Rc<RefCell<Box<dyn CommandReporter>>>,
}

#[derive(Default)]
struct BlockedState {
    /// Label of the outstanding command
    current: RefCell<Option<String>>,
    /// Text shown while the command blocks
    status: RefCell<Option<String>>,
}

/// Holds the blocked state for one command and clears it when dropped, so
/// neither a failure nor a dropped task leaves a stale status behind.
struct BlockedGuard {
    state: Rc<BlockedState>,
}

impl BlockedGuard {
    fn enter(state: Rc<BlockedState>, label: &str) -> Self {
        *state.current.borrow_mut() = Some(label.to_string());
        *state.status.borrow_mut() = Some(label.to_string());
        Self { state }
    }
}

impl Drop for BlockedGuard {
    fn drop(&mut self) {
        self.state.current.borrow_mut().take();
        self.state.status.borrow_mut().take();
    }
}

impl CommandOrchestrator {
    pub fn new(scheduler: Scheduler, refresher: impl StateRefresher + 'static) -> Self {
        Self {
            scheduler,
            state: Rc::new(BlockedState::default()),
            refresher: Rc::new(refresher),
            reporter: Rc::new(RefCell::new(Box::new(NoOpReporter::default()))),
        }
    }

    /// Report command activity to `reporter`
    pub fn with_reporter(self, reporter: impl CommandReporter + 'static) -> Self {
        *self.reporter.borrow_mut() = Box::new(reporter);
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The live status text of the outstanding command
    pub fn blocked_status(&self) -> Option<String> {
        self.state.status.borrow().clone()
    }

    /// True while a command started by this orchestrator is outstanding
    pub fn is_busy(&self) -> bool {
        self.state.current.borrow().is_some()
    }

    /// Run the command operation created by `factory` and wait for its
    /// terminal response.
    ///
    /// The operation is driven by a blocking task titled `label`, starting
    /// on the tick after this future is first polled. The refresher runs
    /// once when the response arrives, whether it succeeded or not.
    ///
    /// # Panics
    ///
    /// Panics on the scheduler's tick if the operation ends without a
    /// terminal response or keeps yielding after it.
    pub async fn run<F, S, T>(&self, label: impl Into<String>, factory: F) -> Result<T, CommandError>
    where
        F: FnOnce() -> S + 'static,
        S: Stream<Item = CommandEvent<T>> + 'static,
        T: 'static,
    {
        let label = label.into();
        if let Some(current) = self.state.current.borrow().clone() {
            warn!(command = %label, running = %current, "Refusing to start command while another one is running");
            return Err(CommandError::busy(current));
        }

        let guard = BlockedGuard::enter(self.state.clone(), &label);
        let id = self.reporter.borrow_mut().on_started(&label);
        info!(command = %label, "Running command");

        let state = self.state.clone();
        let refresher = self.refresher.clone();
        let reporter = self.reporter.clone();
        let driver_label = label.clone();
        let driver = async move {
            let _guard = guard;
            let response = pump(&driver_label, id, factory(), &state, &reporter).await;

            refresher.refresh();
            let outcome = match &response {
                CommandResponse::Succeeded(_) => Ok(()),
                CommandResponse::Failed(message) => Err(message.as_str()),
            };
            reporter.borrow_mut().on_finished(id, outcome);

            Ok::<_, TaskError>(response.into_result().map_err(CommandError::failed))
        };

        let handle = self
            .scheduler
            .submit(driver, TaskOptions::blocking(label.clone()));

        match handle.await {
            Ok(Ok(payload)) => {
                info!(command = %label, "Command succeeded");
                Ok(payload)
            }
            Ok(Err(err)) => {
                warn!(command = %label, error = %err, "Command failed");
                Err(err)
            }
            Err(_) => Err(CommandError::aborted(label)),
        }
    }
}

/// Consume progress events until the terminal response arrives.
async fn pump<S, T>(
    label: &str,
    id: CommandId,
    operation: S,
    state: &BlockedState,
    reporter: &RefCell<Box<dyn CommandReporter>>,
) -> CommandResponse<T>
where
    S: Stream<Item = CommandEvent<T>>,
{
    let mut events = std::pin::pin!(operation);

    let response = loop {
        match events.next().await {
            Some(CommandEvent::Progress(lines)) => {
                if let Some(last) = lines.last() {
                    *state.status.borrow_mut() = Some(last.clone());
                }
                for line in &lines {
                    debug!(command = label, line = line.as_str(), "Command output");
                    reporter.borrow_mut().on_output(id, line);
                }
                yield_now().await;
            }
            Some(CommandEvent::Response(response)) => break response,
            None => panic!("command '{label}' finished without a terminal response"),
        }
    };

    match futures::poll!(events.next()) {
        Poll::Ready(None) => response,
        _ => panic!("command '{label}' kept running after its terminal response"),
    }
}
