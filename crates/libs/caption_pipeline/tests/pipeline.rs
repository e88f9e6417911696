use app_state::CaptioningSettings;
use caption_pipeline::{
    CaptionPipeline, CaptionPrompt, Captioner, ItemOutcome, NoProgress, OutcomeLog, RetryPolicy,
    RunStats, TemplateCaptioner,
};
use color_eyre::Result;
use language_model::{LlmError, LlmResult, StatusCode};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MASKS: [&str; 3] = [
    "p1_frame1_0_MRI_heart_left+ventricle.png",
    "p1_frame1_1_MRI_heart_right+ventricle.png",
    "p1_frame2_0_MRI_heart_left+ventricle.png",
];

/// Answers "Segment the <target>." and tracks how many calls overlap.
#[derive(Default)]
struct StubCaptioner {
    calls: Cell<usize>,
    in_flight: Cell<usize>,
    peak: Cell<usize>,
    delay: Option<Duration>,
}

impl Captioner for StubCaptioner {
    async fn caption(&self, prompt: &CaptionPrompt) -> LlmResult<String> {
        self.calls.set(self.calls.get() + 1);
        self.in_flight.set(self.in_flight.get() + 1);
        self.peak.set(self.peak.get().max(self.in_flight.get()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.set(self.in_flight.get() - 1);
        Ok(format!("Segment the {}.", prompt.metadata.target))
    }
}

/// Always returns the same answer or error.
struct FixedCaptioner(fn() -> LlmResult<String>);

impl Captioner for FixedCaptioner {
    async fn caption(&self, _prompt: &CaptionPrompt) -> LlmResult<String> {
        (self.0)()
    }
}

/// Cancels the run from inside the first call.
struct CancellingCaptioner(CancellationToken);

impl Captioner for CancellingCaptioner {
    async fn caption(&self, _prompt: &CaptionPrompt) -> LlmResult<String> {
        self.0.cancel();
        Ok("Segment the structure.".to_string())
    }
}

fn dataset() -> Result<(tempfile::TempDir, PathBuf)> {
    let root = tempfile::tempdir()?;
    let mask_dir = root.path().join("ACDC").join("train_mask");
    fs::create_dir_all(&mask_dir)?;
    fs::create_dir_all(root.path().join("ACDC").join("train"))?;
    for mask in MASKS {
        fs::write(mask_dir.join(mask), b"")?;
    }
    let caption_dir = root.path().join("ACDC").join("train_caption");
    Ok((root, caption_dir))
}

fn settings() -> CaptioningSettings {
    CaptioningSettings {
        concurrency: 2,
        ..CaptioningSettings::default()
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(40),
        multiplier: 2,
    }
}

fn pipeline<C: Captioner>(captioner: C, settings: CaptioningSettings) -> CaptionPipeline<C> {
    CaptionPipeline::new(captioner, settings, fast_retry(), CancellationToken::new())
}

fn caption_of(caption_dir: &Path, mask: &str) -> Result<String> {
    let name = mask.replace(".png", ".txt");
    Ok(fs::read_to_string(caption_dir.join(name))?)
}

#[tokio::test]
async fn captions_every_mask() -> Result<()> {
    // ARRANGE
    let (root, caption_dir) = dataset()?;
    let pipeline = pipeline(StubCaptioner::default(), settings());

    // ACT
    let stats = pipeline.run(root.path(), &mut NoProgress).await;

    // ASSERT
    assert_eq!(
        stats,
        RunStats {
            seen: 3,
            written: 3,
            ..RunStats::default()
        }
    );
    assert_eq!(
        caption_of(&caption_dir, MASKS[0])?,
        "Segment the left ventricle.\n"
    );
    assert_eq!(
        caption_of(&caption_dir, MASKS[1])?,
        "Segment the right ventricle.\n"
    );
    assert_eq!(
        caption_of(&caption_dir, MASKS[2])?,
        "Segment the left ventricle.\n"
    );
    Ok(())
}

#[tokio::test]
async fn existing_captions_are_skipped() -> Result<()> {
    // ARRANGE
    let (root, caption_dir) = dataset()?;
    fs::create_dir_all(&caption_dir)?;
    fs::write(
        caption_dir.join(MASKS[1].replace(".png", ".txt")),
        "Outline the right ventricle.\n",
    )?;
    let pipeline = pipeline(StubCaptioner::default(), settings());

    // ACT
    let stats = pipeline.run(root.path(), &mut NoProgress).await;

    // ASSERT
    assert_eq!((stats.written, stats.skipped), (2, 1));
    assert_eq!(pipeline.captioner().calls.get(), 2);
    assert_eq!(
        caption_of(&caption_dir, MASKS[1])?,
        "Outline the right ventricle.\n"
    );
    Ok(())
}

#[tokio::test]
async fn second_run_does_no_work() -> Result<()> {
    let (root, _caption_dir) = dataset()?;
    let pipeline = pipeline(StubCaptioner::default(), settings());

    pipeline.run(root.path(), &mut NoProgress).await;
    let second = pipeline.run(root.path(), &mut NoProgress).await;

    assert_eq!(second.skipped, 3);
    assert_eq!(second.written, 0);
    Ok(())
}

#[tokio::test]
async fn stale_and_forced_captions_are_regenerated() -> Result<()> {
    // ARRANGE
    let (root, caption_dir) = dataset()?;
    fs::create_dir_all(&caption_dir)?;
    let long = vec!["word"; 31].join(" ");
    fs::write(caption_dir.join(MASKS[0].replace(".png", ".txt")), long)?;
    fs::write(caption_dir.join(MASKS[1].replace(".png", ".txt")), "")?;
    fs::write(caption_dir.join(MASKS[2].replace(".png", ".txt")), "Keep me.")?;

    // ACT
    let stats = pipeline(StubCaptioner::default(), settings())
        .run(root.path(), &mut NoProgress)
        .await;

    // ASSERT
    assert_eq!((stats.written, stats.skipped), (2, 1));
    assert_eq!(
        caption_of(&caption_dir, MASKS[0])?,
        "Segment the left ventricle.\n"
    );
    assert_eq!(caption_of(&caption_dir, MASKS[2])?, "Keep me.");

    // ACT again, forcing everything
    let forced = CaptioningSettings {
        force_regenerate: true,
        ..settings()
    };
    let stats = pipeline(StubCaptioner::default(), forced)
        .run(root.path(), &mut NoProgress)
        .await;

    assert_eq!((stats.written, stats.skipped), (3, 0));
    assert_eq!(
        caption_of(&caption_dir, MASKS[2])?,
        "Segment the left ventricle.\n"
    );
    Ok(())
}

#[tokio::test]
async fn permanent_errors_fail_items_without_writing() -> Result<()> {
    // ARRANGE
    let (root, caption_dir) = dataset()?;
    let captioner = FixedCaptioner(|| {
        Err(LlmError::Api {
            status: StatusCode::BAD_REQUEST,
            body: "bad request".to_string(),
        })
    });
    let mut log = OutcomeLog::default();

    // ACT
    let stats = pipeline(captioner, settings()).run(root.path(), &mut log).await;

    // ASSERT
    assert_eq!((stats.seen, stats.failed), (3, 3));
    assert!(!caption_dir.exists());
    assert_eq!(log.started, vec![("ACDC/train_mask".to_string(), 3)]);
    assert!(
        log.outcomes
            .iter()
            .all(|o| matches!(o, ItemOutcome::Failed { .. }))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_fail_the_item() -> Result<()> {
    let (root, caption_dir) = dataset()?;
    let captioner = FixedCaptioner(|| {
        Err(LlmError::Api {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "overloaded".to_string(),
        })
    });

    let stats = pipeline(captioner, settings()).run(root.path(), &mut NoProgress).await;

    assert_eq!(stats.failed, 3);
    assert!(!caption_dir.exists());
    Ok(())
}

#[tokio::test]
async fn empty_answers_fall_back_to_template() -> Result<()> {
    let (root, caption_dir) = dataset()?;
    let captioner = FixedCaptioner(|| Ok(String::new()));

    let stats = pipeline(captioner, settings()).run(root.path(), &mut NoProgress).await;

    assert_eq!((stats.written, stats.fallback), (3, 3));
    assert_eq!(
        caption_of(&caption_dir, MASKS[0])?,
        "Segment left ventricle in heart MRI\n"
    );
    Ok(())
}

#[tokio::test]
async fn fallback_captions_respect_small_word_limits() -> Result<()> {
    // ARRANGE
    let (root, caption_dir) = dataset()?;
    let short = CaptioningSettings {
        max_caption_words: 5,
        ..settings()
    };
    let pipeline = pipeline(FixedCaptioner(|| Ok(String::new())), short);

    // ACT
    let first = pipeline.run(root.path(), &mut NoProgress).await;
    let second = pipeline.run(root.path(), &mut NoProgress).await;

    // ASSERT
    assert_eq!((first.written, first.fallback), (3, 3));
    assert_eq!(
        caption_of(&caption_dir, MASKS[0])?,
        "Segment left ventricle\n"
    );
    // Fallback captions pass validation, so the rerun has nothing to redo.
    assert_eq!((second.written, second.skipped), (0, 3));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn remote_calls_never_exceed_concurrency() -> Result<()> {
    // ARRANGE
    let (root, _caption_dir) = dataset()?;
    let mask_dir = root.path().join("ACDC").join("train_mask");
    for i in 0..20 {
        fs::write(mask_dir.join(format!("extra{i:02}_CT_liver_liver.png")), b"")?;
    }
    let stub = StubCaptioner {
        delay: Some(Duration::from_millis(50)),
        ..StubCaptioner::default()
    };
    let pipeline = pipeline(stub, settings());

    // ACT
    let stats = pipeline.run(root.path(), &mut NoProgress).await;

    // ASSERT
    assert_eq!(stats.written, 23);
    let peak = pipeline.captioner().peak.get();
    assert_eq!(peak, 2, "two permits must be in use at once");
    assert_eq!(pipeline.captioner().calls.get(), 23);
    Ok(())
}

#[tokio::test]
async fn limit_per_folder_caps_work() -> Result<()> {
    let (root, caption_dir) = dataset()?;
    let limited = CaptioningSettings {
        limit_per_folder: 2,
        ..settings()
    };

    let stats = pipeline(StubCaptioner::default(), limited)
        .run(root.path(), &mut NoProgress)
        .await;

    assert_eq!(stats.seen, 2);
    assert!(!caption_dir.join(MASKS[2].replace(".png", ".txt")).exists());
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_items_waiting_for_the_gate() -> Result<()> {
    // ARRANGE
    let (root, caption_dir) = dataset()?;
    let cancel = CancellationToken::new();
    let one_at_a_time = CaptioningSettings {
        concurrency: 1,
        ..settings()
    };
    let pipeline = CaptionPipeline::new(
        CancellingCaptioner(cancel.clone()),
        one_at_a_time,
        fast_retry(),
        cancel,
    );

    // ACT
    let stats = pipeline.run(root.path(), &mut NoProgress).await;

    // ASSERT
    assert_eq!(
        stats,
        RunStats {
            seen: 3,
            written: 1,
            cancelled: 2,
            ..RunStats::default()
        }
    );
    assert_eq!(fs::read_dir(&caption_dir)?.count(), 1);
    Ok(())
}

#[tokio::test]
async fn template_captioner_writes_simple_captions() -> Result<()> {
    let (root, _caption_dir) = dataset()?;
    let simple = CaptioningSettings {
        caption_suffix: "simple_caption".to_string(),
        ..settings()
    };

    let stats = pipeline(TemplateCaptioner, simple)
        .run(root.path(), &mut NoProgress)
        .await;

    assert_eq!(stats.written, 3);
    let simple_dir = root.path().join("ACDC").join("train_simple_caption");
    assert_eq!(
        caption_of(&simple_dir, MASKS[0])?,
        "Left ventricle in heart MRI\n"
    );
    Ok(())
}
