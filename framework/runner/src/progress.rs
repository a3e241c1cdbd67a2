use std::fmt::Write;

use indicatif::{ProgressBar, ProgressState, ProgressStyle};

use crate::listener::Listener;

/// Displays a progress bar while the benchmark is running to show the user how much is left.
pub struct ProgressListener {
    pb: ProgressBar,
}

impl ProgressListener {
    /// `total_executions` is the number of measured executions across all scenarios.
    pub fn new(total_executions: usize) -> Self {
        let pb = ProgressBar::new(total_executions as u64);
        match ProgressStyle::with_template(
            "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} [{elapsed_precise}] {eta_label} {msg}",
        ) {
            Ok(style) => pb.set_style(
                style
                    .with_key("eta_label", |state: &ProgressState, w: &mut dyn Write| {
                        let _ = write!(w, "eta {}s", state.eta().as_secs());
                    })
                    .progress_chars("#>-"),
            ),
            Err(e) => log::warn!("Failed to set progress style: {e}"),
        }

        Self { pb }
    }

    pub fn position(&self) -> u64 {
        self.pb.position()
    }
}

impl Listener for ProgressListener {
    fn on_scenario_start(&self, id: &str) {
        self.pb.set_message(id.to_string());
    }

    fn on_scenario_end(&self, _id: &str) {
        self.pb.inc(1);
    }

    fn on_error(&self, id: &str, error: &anyhow::Error) {
        self.pb.println(format!("[{id}] {error:#}"));
    }

    fn on_benchmark_end(&self) {
        log::trace!("Progress bar finished");
        self.pb.finish_and_clear();
    }
}
