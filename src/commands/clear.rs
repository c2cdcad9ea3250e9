//! Clear command implementation

use std::time::Duration;

use boardid_core::{BoardCollection, BusSet, BusTransport, Progress};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use super::print_outcome;

/// Create a progress bar labelled with the slot being cleared
fn create_progress_bar(total: u64, label: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} {}",
                label
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for IndicatifProgress {
    fn begin(&mut self, label: &str, total_bytes: usize) {
        let total = total_bytes as u64;
        let pb = self.multi.add(
            create_progress_bar(total, label).unwrap_or_else(|_| ProgressBar::new(total)),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    fn advance(&mut self, bytes_done: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(bytes_done as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish();
        }
    }
}

/// Erase every fitted board
pub fn run_clear<B: BusTransport>(
    collection: &mut BoardCollection,
    buses: &mut BusSet<B>,
    half_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut progress = IndicatifProgress::new();
    let outcome = collection.clear_all(buses, half_only, &mut progress)?;
    print_outcome("clear", &outcome);
    Ok(())
}
