use crate::captioner::Captioner;
use crate::enumerate::{DatasetSplit, discover_splits, enumerate_masks};
use crate::gate::ConcurrencyGate;
use crate::progress::ProgressObserver;
use crate::resume::{Resumability, check_output};
use crate::retry::RetryPolicy;
use crate::scheduler::{ItemOutcome, run_items};
use crate::service::CaptionService;
use crate::stats::{RunReport, RunStats};
use crate::work_item::WorkItem;
use app_state::CaptioningSettings;
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Captions every mask folder under a dataset root, one folder at a time.
pub struct CaptionPipeline<C> {
    service: CaptionService<C>,
    settings: CaptioningSettings,
    cancel: CancellationToken,
}

impl<C: Captioner> CaptionPipeline<C> {
    pub fn new(
        captioner: C,
        settings: CaptioningSettings,
        retry: RetryPolicy,
        cancel: CancellationToken,
    ) -> Self {
        let service = CaptionService::new(
            captioner,
            retry,
            settings.max_caption_words,
            settings.max_rerequests,
        );
        Self {
            service,
            settings,
            cancel,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CaptioningSettings {
        &self.settings
    }

    pub fn captioner(&self) -> &C {
        self.service.captioner()
    }

    /// Processes all folders found under `root` and returns the run totals.
    /// Folders not started before cancellation are left untouched.
    pub async fn run(&self, root: &Path, observer: &mut dyn ProgressObserver) -> RunStats {
        self.run_timed(root, observer).await.stats
    }

    /// Same as [`Self::run`], also reporting the wall-clock duration.
    pub async fn run_timed(
        &self,
        root: &Path,
        observer: &mut dyn ProgressObserver,
    ) -> RunReport {
        let start = Instant::now();
        let splits = discover_splits(root, &self.settings.splits);
        info!("Found {} mask folders under {}", splits.len(), root.display());

        let mut total = RunStats::default();
        for split in &splits {
            if self.cancel.is_cancelled() {
                warn!("Run cancelled, not starting {}", split.label());
                break;
            }
            total += self.process_split(split, observer).await;
        }

        let report = RunReport {
            stats: total,
            elapsed: start.elapsed(),
        };
        info!("Captioning finished: {report}");
        report
    }

    /// Captions one `<split>_mask` folder. Up-to-date captions are counted as
    /// skipped and never reach the remote service.
    pub async fn process_split(
        &self,
        split: &DatasetSplit,
        observer: &mut dyn ProgressObserver,
    ) -> RunStats {
        let label = split.label();
        let masks = enumerate_masks(
            &split.mask_dir,
            &self.settings.mask_extension,
            self.settings.limit_per_folder,
        );

        let mut stats = RunStats::default();
        let mut pending = Vec::new();
        for mask in masks {
            let item = match WorkItem::from_mask(&mask, &self.settings) {
                Ok(item) => item,
                Err(e) => {
                    error!("Skipping {}: {e}", mask.display());
                    stats.record(&ItemOutcome::Failed {
                        mask_path: mask,
                        error: e.to_string(),
                    });
                    continue;
                }
            };
            match check_output(&item.output_path, &self.settings) {
                Resumability::Done => stats.record(&ItemOutcome::Skipped { mask_path: mask }),
                Resumability::Needed(reason) => {
                    debug!("{} needs a caption: {reason}", item.output_path.display());
                    pending.push(item);
                }
            }
        }
        info!(
            "{label}: {} to caption, {} already done",
            pending.len(),
            stats.skipped
        );
        if pending.is_empty() {
            return stats;
        }

        let gate = ConcurrencyGate::new(self.settings.concurrency, self.cancel.clone());
        observer.on_start(&label, pending.len());
        stats += run_items(pending, &self.service, &gate, observer).await;
        observer.on_finish();

        info!(
            "{label}: {stats} (peak {} of {} in flight)",
            gate.peak(),
            gate.limit()
        );
        stats
    }
}
