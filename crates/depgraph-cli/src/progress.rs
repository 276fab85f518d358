//! Progress tracking utilities for CLI operations

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Manages the spinner shown while the registry is being queried
pub struct ProgressManager {
    spinner: Option<ProgressBar>,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with `message`, replacing any running one
    pub fn start_task(&mut self, message: impl Into<String>) {
        if let Some(previous) = self.spinner.take() {
            previous.finish_and_clear();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.into());
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// Update the message of the running spinner
    pub fn set_message(&self, message: impl Into<String>) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(message.into());
        }
    }

    /// Stop the spinner, leaving `message` behind
    pub fn finish_task(&mut self, message: impl Into<String>) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(message.into());
        }
    }

    /// Stop the spinner where it is
    pub fn abandon_task(&mut self, message: impl Into<String>) {
        if let Some(spinner) = self.spinner.take() {
            spinner.abandon_with_message(message.into());
        }
    }

    pub fn is_active(&self) -> bool {
        self.spinner.is_some()
    }

    /// Start the resolution process
    pub fn start_resolution(&mut self, pins: usize) {
        self.start_task(format!("Resolving dependencies of {} pinned packages...", pins));
    }

    /// Finish the resolution process
    pub fn finish_resolution(&mut self) {
        self.finish_task("Dependencies resolved");
    }

    /// Stop the resolution process after a failure
    pub fn abandon_resolution(&mut self) {
        self.abandon_task("Resolution stopped");
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}
