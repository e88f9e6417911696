use crate::captioner::Captioner;
use crate::error::ItemError;
use crate::gate::ConcurrencyGate;
use crate::progress::ProgressObserver;
use crate::service::CaptionService;
use crate::stats::RunStats;
use crate::work_item::WorkItem;
use crate::writer::write_caption;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::path::PathBuf;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Written {
        mask_path: PathBuf,
        output_path: PathBuf,
        fallback: bool,
    },
    /// The existing caption was kept.
    Skipped { mask_path: PathBuf },
    Failed {
        mask_path: PathBuf,
        error: String,
    },
    /// The run was cancelled before this item reached the remote service.
    Cancelled { mask_path: PathBuf },
}

impl ItemOutcome {
    #[must_use]
    pub fn mask_path(&self) -> &PathBuf {
        match self {
            Self::Written { mask_path, .. }
            | Self::Skipped { mask_path }
            | Self::Failed { mask_path, .. }
            | Self::Cancelled { mask_path } => mask_path,
        }
    }
}

/// Captions one item and writes the result. Every error ends up in the
/// returned outcome; nothing here aborts the run.
pub async fn process_item<C: Captioner>(
    item: WorkItem,
    service: &CaptionService<C>,
    gate: &ConcurrencyGate,
) -> ItemOutcome {
    let WorkItem {
        mask_path,
        output_path,
        prompt,
    } = item;

    let result = match service.caption(&prompt, gate).await {
        Ok(caption) => write_caption(&output_path, &caption.text)
            .await
            .map(|()| caption.fallback),
        Err(e) => Err(e),
    };

    match result {
        Ok(fallback) => {
            debug!("Wrote {}", output_path.display());
            ItemOutcome::Written {
                mask_path,
                output_path,
                fallback,
            }
        }
        Err(ItemError::Cancelled) => ItemOutcome::Cancelled { mask_path },
        Err(e) => {
            error!("Failed to caption {}: {e}", mask_path.display());
            ItemOutcome::Failed {
                mask_path,
                error: e.to_string(),
            }
        }
    }
}

/// Runs all items concurrently, bounded by `gate`, and tallies the outcomes
/// in completion order.
pub async fn run_items<C: Captioner>(
    items: Vec<WorkItem>,
    service: &CaptionService<C>,
    gate: &ConcurrencyGate,
    observer: &mut dyn ProgressObserver,
) -> RunStats {
    let mut stats = RunStats::default();
    let mut pending: FuturesUnordered<_> = items
        .into_iter()
        .map(|item| process_item(item, service, gate))
        .collect();

    while let Some(outcome) = pending.next().await {
        stats.record(&outcome);
        observer.on_complete(&outcome);
    }
    stats
}
