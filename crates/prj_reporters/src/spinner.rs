use std::{collections::HashMap, time::Duration};

use command_dispatcher::{CommandId, CommandReporter};
use indexmap::IndexMap;
use indicatif::{MultiProgress, ProgressBar};

/// Shows a spinner per running command with its latest output line.
pub struct StatusSpinnerReporter {
    /// The multi-progress bar. Usually, this is the global multi-progress bar.
    multi_progress: MultiProgress,
    /// The progress bar that is used as an anchor for placing other progress.
    anchor: ProgressBar,
    /// The id of the next command
    next_id: usize,
    /// A map of progress bars, by ID.
    bars: IndexMap<CommandId, ProgressBar>,
    /// Labels of the running commands
    labels: HashMap<CommandId, String>,
}

impl StatusSpinnerReporter {
    /// Creates a new spinner reporter.
    pub fn new(multi_progress: MultiProgress, anchor: ProgressBar) -> Self {
        Self {
            multi_progress,
            anchor,
            next_id: 0,
            bars: Default::default(),
            labels: Default::default(),
        }
    }

    fn next_command_id(&mut self) -> CommandId {
        let id = CommandId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn spinner_style() -> indicatif::ProgressStyle {
        indicatif::ProgressStyle::with_template("  {spinner:.green} {prefix:30!} {wide_msg:.dim}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner())
    }

    /// Returns the progress bar at the bottom
    pub fn last_progress_bar(&self) -> Option<&ProgressBar> {
        self.bars.last().map(|(_, pb)| pb)
    }

    /// Number of spinners currently shown
    pub fn active(&self) -> usize {
        self.bars.len()
    }
}

impl CommandReporter for StatusSpinnerReporter {
    fn on_started(&mut self, label: &str) -> CommandId {
        let id = self.next_command_id();
        let pb = self.multi_progress.insert_after(
            self.last_progress_bar().unwrap_or(&self.anchor),
            ProgressBar::hidden(),
        );
        pb.set_style(StatusSpinnerReporter::spinner_style());
        pb.set_prefix(label.to_string());
        pb.set_message(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        self.bars.insert(id, pb);
        self.labels.insert(id, label.to_string());
        id
    }

    fn on_output(&mut self, id: CommandId, line: &str) {
        if let Some(pb) = self.bars.get(&id) {
            pb.set_message(line.to_string());
        }
    }

    fn on_finished(&mut self, id: CommandId, result: Result<(), &str>) {
        let label = self.labels.remove(&id).unwrap_or_default();
        if let Some(pb) = self.bars.shift_remove(&id) {
            pb.finish_and_clear();
        }
        if let Err(message) = result {
            let _ = self
                .multi_progress
                .println(format!("{label} failed: {message}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    fn hidden_reporter() -> StatusSpinnerReporter {
        let multi_progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let anchor = multi_progress.add(ProgressBar::hidden());
        StatusSpinnerReporter::new(multi_progress, anchor)
    }

    #[test]
    fn test_spinner_tracks_latest_line() {
        let mut reporter = hidden_reporter();
        let id = reporter.on_started("Installing numpy");
        assert_eq!(reporter.active(), 1);

        let pb = reporter.last_progress_bar().cloned().unwrap();
        assert_eq!(pb.prefix(), "Installing numpy");
        assert_eq!(pb.message(), "Installing numpy");

        reporter.on_output(id, "resolving");
        reporter.on_output(id, "linking");
        assert_eq!(pb.message(), "linking");

        reporter.on_finished(id, Ok(()));
        assert_eq!(reporter.active(), 0);
        assert!(pb.is_finished());
    }

    #[test]
    fn test_spinners_stack_in_start_order() {
        let mut reporter = hidden_reporter();
        let first = reporter.on_started("Installing");
        let second = reporter.on_started("Listing");
        assert_eq!(reporter.last_progress_bar().unwrap().prefix(), "Listing");

        reporter.on_finished(second, Err("exit code 2"));
        assert_eq!(reporter.last_progress_bar().unwrap().prefix(), "Installing");

        reporter.on_finished(first, Ok(()));
        assert!(reporter.last_progress_bar().is_none());
    }
}
