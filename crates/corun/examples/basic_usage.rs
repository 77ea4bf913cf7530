//! Basic usage example for the corun scheduler
//!
//! Submits a few cooperative tasks, drives them with a frame timer and prints
//! the blocking status the way a UI would show it.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use corun::{yield_now, Scheduler, SchedulerReporter, TaskError, TaskId, TaskOptions};

/// Prints scheduler events to stdout
struct PrintingReporter;

impl SchedulerReporter for PrintingReporter {
    fn on_blocking_started(&mut self) {
        println!("-- blocked");
    }

    fn on_blocking_completed(&mut self) {
        println!("-- unblocked");
    }

    fn on_task_failed(&mut self, _task_id: TaskId, status_title: Option<&str>, error: &TaskError) {
        println!("-- {} failed: {error}", status_title.unwrap_or("task"));
    }
}

async fn download(name: &'static str, chunks: usize) -> Result<usize, TaskError> {
    for chunk in 0..chunks {
        println!("  {name}: chunk {}/{chunks}", chunk + 1);
        yield_now().await;
    }
    Ok(chunks * 1024)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    println!("=== Basic Corun Usage Example ===\n");

    let scheduler = Scheduler::with_reporter(PrintingReporter);
    let total = Rc::new(RefCell::new(0));

    let first = scheduler.submit(download("numpy", 3), TaskOptions::blocking("Downloading numpy"));
    let second = scheduler.submit(download("scipy", 2), TaskOptions::blocking("Downloading scipy"));

    let summary_total = total.clone();
    let _summary = scheduler.submit(
        async move {
            let bytes = first.await? + second.await?;
            *summary_total.borrow_mut() = bytes;
            Ok::<_, TaskError>(())
        },
        TaskOptions::background(),
    );

    let _flaky = scheduler.submit(
        async {
            yield_now().await;
            Err::<(), TaskError>("mirror unreachable".into())
        },
        TaskOptions::blocking("Checking mirror").with_failure_handler(|err| {
            println!("  recovered: {err}");
        }),
    );

    let mut frames = tokio::time::interval(Duration::from_millis(16));
    while scheduler.is_running() {
        frames.tick().await;
        scheduler.tick()?;
        if let Some(status) = scheduler.status_text() {
            println!("[status] {status}");
        }
    }

    println!("\nDownloaded {} bytes", total.borrow());
    Ok(())
}
