//! Terminal progress for the long-running stages. Everything is drawn to
//! stderr and suppressed entirely under `--quiet`.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(100);

pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Bar over the location roster of one extract run
    pub fn locations(total: u64, dt: &str, quiet: bool) -> Self {
        if quiet {
            return Self::hidden();
        }

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_prefix(format!("dt={}", dt));
        bar.enable_steady_tick(TICK);
        Self { bar }
    }

    /// Spinner for a stage with no natural unit of work
    pub fn stage(label: &str, quiet: bool) -> Self {
        if quiet {
            return Self::hidden();
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(label.to_string());
        bar.enable_steady_tick(TICK);
        Self { bar }
    }

    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn location_done(&self, location_id: &str) {
        self.bar.inc(1);
        self.bar.set_message(location_id.to_string());
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        // A stage that returned early through `?` leaves its bar where it stopped
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
