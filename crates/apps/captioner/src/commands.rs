use app_state::AppSettings;
use caption_pipeline::{
    CaptionPipeline, Captioner, ProgressBarObserver, Resumability, RetryPolicy, RunReport,
    TemplateCaptioner, WorkItem, check_output, discover_splits, enumerate_masks,
};
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use language_model::ChatClient;
use media_convert::{ConvertOptions, convert_tree};
use shard_pack::{PackOptions, PackStats, pack_dataset_root};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Captions the dataset root with the configured language model.
///
/// # Errors
///
/// * The API key is missing, or the HTTP client cannot be built. Nothing has
///   been touched on disk when this happens.
pub async fn caption(settings: &AppSettings) -> Result<RunReport> {
    let api_key = settings.llm.api_key()?;
    let client = ChatClient::with_base_url(&settings.llm.endpoint)
        .model(&settings.llm.model)
        .api_key(api_key)
        .maybe_api_version(settings.llm.api_version.clone())
        .timeout(settings.llm.timeout)
        .maybe_max_completion_tokens(settings.llm.max_completion_tokens)
        .build()
        .wrap_err("Failed to build the language model client")?;
    info!(
        "Captioning with model {} at {}",
        client.model(),
        settings.llm.endpoint
    );

    Ok(run_pipeline(client, settings).await)
}

/// Writes template captions; no network access.
pub async fn simple_caption(settings: &AppSettings) -> RunReport {
    run_pipeline(TemplateCaptioner, settings).await
}

async fn run_pipeline<C: Captioner>(captioner: C, settings: &AppSettings) -> RunReport {
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            ctrl_c_token.cancel();
        }
    });

    let pipeline = CaptionPipeline::new(
        captioner,
        settings.captioning.clone(),
        RetryPolicy::from(&settings.retry),
        cancel.clone(),
    );
    let report = pipeline
        .run_timed(&settings.dataset_root, &mut ProgressBarObserver::default())
        .await;
    if cancel.is_cancelled() {
        warn!("Run was interrupted; rerun to finish the remaining masks");
    }
    report
}

/// One line per mask folder with its caption progress.
pub fn list_datasets(settings: &AppSettings) -> Vec<String> {
    let captioning = &settings.captioning;
    discover_splits(&settings.dataset_root, &captioning.splits)
        .iter()
        .map(|split| {
            let masks = enumerate_masks(&split.mask_dir, &captioning.mask_extension, 0);
            let done = masks
                .iter()
                .filter_map(|mask| WorkItem::from_mask(mask, captioning).ok())
                .filter(|item| check_output(&item.output_path, captioning) == Resumability::Done)
                .count();
            format!("{}: {} masks, {done} captioned", split.label(), masks.len())
        })
        .collect()
}

/// Packs every captioned sample under the dataset root into tar shards.
///
/// # Errors
///
/// * A shard file cannot be created or written.
pub async fn pack(settings: &AppSettings, options: PackOptions) -> Result<PackStats> {
    let root = settings.dataset_root.clone();
    let captioning = settings.captioning.clone();
    tokio::task::spawn_blocking(move || pack_dataset_root(&root, &captioning, &options)).await?
}

/// # Errors
///
/// * `root` is not a directory.
pub async fn convert(root: &Path, options: &ConvertOptions) -> Result<()> {
    let stats = convert_tree(root, options).await?;
    println!("\n=== Summary ===\n{stats}");
    Ok(())
}
