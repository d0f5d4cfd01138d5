use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Progress bar plus the per-file status lines. Lines are emitted with the bar
/// suspended so the two do not interleave on the terminal.
pub(crate) struct ProgressTracker {
    progress_bar: ProgressBar,
}

impl ProgressTracker {
    pub(crate) fn new(len: usize) -> Self {
        let progress_bar = ProgressBar::new(len as u64);
        progress_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );

        Self { progress_bar }
    }

    pub(crate) fn processing(&self, file_name: &str) {
        self.progress_bar
            .suspend(|| info!("Processing {file_name}..."));
    }

    pub(crate) fn saved(&self, output_path: &Path) {
        self.progress_bar
            .suspend(|| info!("Saved processed image to {}", output_path.display()));
        self.progress_bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }

    pub(crate) fn abandon(&self) {
        self.progress_bar.abandon();
    }
}
