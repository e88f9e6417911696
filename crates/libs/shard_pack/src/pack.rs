use crate::sample::{
    ImageStemRule, SampleLayout, build_sample, image_path_for_mask, read_caption_line, stable_key,
};
use crate::shard::ShardWriter;
use app_state::CaptioningSettings;
use caption_pipeline::{
    DatasetSplit, Resumability, caption_path, check_output, discover_splits, enumerate_masks,
};
use color_eyre::eyre::Result;
use std::fmt;
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOptions {
    /// Shards go to `<out_root>/wds_<split>_<caption suffix>/`.
    pub out_root: PathBuf,
    pub max_per_shard: usize,
    /// Written samples per folder; `None` packs everything.
    pub max_total_samples: Option<usize>,
    pub layout: SampleLayout,
    pub image_stem_rule: ImageStemRule,
}

impl PackOptions {
    #[must_use]
    pub fn new(out_root: &Path) -> Self {
        Self {
            out_root: out_root.to_path_buf(),
            max_per_shard: 8000,
            max_total_samples: None,
            layout: SampleLayout::default(),
            image_stem_rule: ImageStemRule::default(),
        }
    }
}

/// `seen` is always `written + skipped + failed`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PackStats {
    pub seen: usize,
    pub written: usize,
    /// No image file, or no usable caption yet.
    pub skipped: usize,
    pub failed: usize,
    pub shards: usize,
}

impl AddAssign for PackStats {
    fn add_assign(&mut self, other: Self) {
        self.seen += other.seen;
        self.written += other.written;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.shards += other.shards;
    }
}

impl fmt::Display for PackStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "seen {}, written {}, skipped {}, failed {}, {} shards",
            self.seen, self.written, self.skipped, self.failed, self.shards
        )
    }
}

/// Packs every mask folder under `root`.
///
/// # Errors
///
/// * A shard cannot be created or written. Problems with single samples are
///   only counted.
pub fn pack_dataset_root(
    root: &Path,
    settings: &CaptioningSettings,
    options: &PackOptions,
) -> Result<PackStats> {
    let start = Instant::now();
    let splits = discover_splits(root, &settings.splits);
    info!("Packing {} mask folders under {}", splits.len(), root.display());

    let mut total = PackStats::default();
    for split in &splits {
        total += pack_split(root, split, settings, options)?;
    }
    info!("Packing finished in {:.1?}: {total}", start.elapsed());
    Ok(total)
}

/// Packs one `<split>_mask` folder into
/// `<out_root>/wds_<split>_<suffix>/<dataset>_seg-NNNNNN.tar`.
///
/// A sample is only packed when its image exists and its caption would be
/// kept by the captioner; anything else is skipped so an unfinished
/// captioning run never leaks empty or overlong captions into a shard.
pub fn pack_split(
    root: &Path,
    split: &DatasetSplit,
    settings: &CaptioningSettings,
    options: &PackOptions,
) -> Result<PackStats> {
    let masks = enumerate_masks(&split.mask_dir, &settings.mask_extension, 0);
    if masks.is_empty() {
        return Ok(PackStats::default());
    }
    let dataset = split
        .mask_dir
        .parent()
        .and_then(Path::file_name)
        .map_or_else(|| "dataset".to_string(), |n| n.to_string_lossy().into_owned());
    let out_dir = options.out_root.join(format!(
        "wds_{}_{}",
        split.split, settings.caption_suffix
    ));
    // Forcing regeneration must not make every caption look unusable here.
    let keep_rule = CaptioningSettings {
        force_regenerate: false,
        ..settings.clone()
    };

    let mut writer = ShardWriter::new(&out_dir, &format!("{dataset}_seg"), options.max_per_shard)?;
    let removed = writer.remove_existing()?;
    if removed > 0 {
        debug!("Removed {removed} old shards from {}", out_dir.display());
    }
    let mut stats = PackStats::default();

    for mask in &masks {
        if options
            .max_total_samples
            .is_some_and(|max| stats.written >= max)
        {
            break;
        }
        stats.seen += 1;

        let image = image_path_for_mask(mask, &split.image_dir, options.image_stem_rule);
        if !image.is_file() {
            debug!("No image {} for {}", image.display(), mask.display());
            stats.skipped += 1;
            continue;
        }
        let caption = match caption_path(mask, &settings.caption_suffix) {
            Ok(caption) => caption,
            Err(e) => {
                warn!("{e}");
                stats.failed += 1;
                continue;
            }
        };
        if let Resumability::Needed(reason) = check_output(&caption, &keep_rule) {
            debug!("Caption {} not usable: {reason}", caption.display());
            stats.skipped += 1;
            continue;
        }

        let key = stable_key(root, mask, &image);
        let sample = read_caption_line(&caption)
            .and_then(|text| build_sample(key, &image, mask, text, options.layout));
        match sample {
            Ok(sample) => {
                writer.write(&sample)?;
                stats.written += 1;
            }
            Err(e) => {
                warn!("Failed to pack {}: {e:#}", mask.display());
                stats.failed += 1;
            }
        }
    }

    stats.shards = writer.finish()?.len();
    info!("{}: {stats} -> {}", split.label(), out_dir.display());
    Ok(stats)
}
