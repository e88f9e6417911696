use crate::scheduler::ItemOutcome;
use indicatif::{ProgressBar, ProgressStyle};

/// Receives per-folder progress. Purely observational.
pub trait ProgressObserver {
    fn on_start(&mut self, _label: &str, _total: usize) {}
    fn on_complete(&mut self, outcome: &ItemOutcome);
    fn on_finish(&mut self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_complete(&mut self, _outcome: &ItemOutcome) {}
}

/// Terminal progress bar, one per folder.
#[derive(Debug, Default)]
pub struct ProgressBarObserver {
    bar: Option<ProgressBar>,
}

impl ProgressObserver for ProgressBarObserver {
    fn on_start(&mut self, label: &str, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.set_message(label.to_string());
        self.bar = Some(bar);
    }

    fn on_complete(&mut self, _outcome: &ItemOutcome) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Collects every outcome. Handy for inspecting a run.
#[derive(Debug, Default)]
pub struct OutcomeLog {
    pub started: Vec<(String, usize)>,
    pub outcomes: Vec<ItemOutcome>,
}

impl ProgressObserver for OutcomeLog {
    fn on_start(&mut self, label: &str, total: usize) {
        self.started.push((label.to_string(), total));
    }

    fn on_complete(&mut self, outcome: &ItemOutcome) {
        self.outcomes.push(outcome.clone());
    }
}
