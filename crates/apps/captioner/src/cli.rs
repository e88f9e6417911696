use app_state::AppSettings;
use clap::{Args, Parser, Subcommand};
use media_convert::ConvertOptions;
use shard_pack::{ImageStemRule, PackOptions, SampleLayout};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(version, about = "Captions medical segmentation masks", long_about = None)]
pub struct Cli {
    /// Settings file. Defaults to `config/settings.yaml` when it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate captions with the configured language model.
    Caption(CaptionArgs),
    /// Write template captions ("<Target> in <site> <modality>") without any
    /// remote calls.
    SimpleCaption(CaptionArgs),
    /// List mask folders and how many of their masks are captioned.
    ListDatasets(DatasetArgs),
    /// Pack (image, mask, caption) samples into tar shards.
    Pack(PackArgs),
    /// Convert webp (and optionally jpg, bmp, tiff) to png and gif to mp4.
    Convert(ConvertArgs),
}

/// Selects the mask folders to work on.
#[derive(Args, Debug, Default)]
pub struct DatasetArgs {
    /// Root folder with the datasets. Overrides `dataset_root`.
    pub dataset_root: Option<PathBuf>,

    /// Captions live in `<split>_<suffix>`.
    #[arg(long)]
    pub caption_suffix: Option<String>,

    /// Comma-separated split names, e.g. `train,test`.
    #[arg(long, value_delimiter = ',')]
    pub splits: Option<Vec<String>>,
}

impl DatasetArgs {
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(root) = &self.dataset_root {
            settings.dataset_root = std::path::absolute(root).unwrap_or_else(|_| root.clone());
        }
        if let Some(suffix) = &self.caption_suffix {
            settings.captioning.caption_suffix.clone_from(suffix);
        }
        if let Some(splits) = &self.splits {
            settings.captioning.splits.clone_from(splits);
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct CaptionArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Maximum number of remote calls in flight.
    #[arg(long)]
    pub concurrency: Option<NonZeroUsize>,

    /// Captions with more words than this are regenerated.
    #[arg(long)]
    pub max_words: Option<NonZeroUsize>,

    /// Regenerate every caption, even valid ones.
    #[arg(long, short, action)]
    pub force: bool,

    /// Only process the first N masks of each folder.
    #[arg(long)]
    pub limit_per_folder: Option<usize>,
}

impl CaptionArgs {
    /// Applies the flags that were given on top of the loaded settings.
    pub fn apply(&self, settings: &mut AppSettings) {
        self.dataset.apply(settings);
        let captioning = &mut settings.captioning;
        if let Some(concurrency) = self.concurrency {
            captioning.concurrency = concurrency.get();
        }
        if let Some(max_words) = self.max_words {
            captioning.max_caption_words = max_words.get();
        }
        if self.force {
            captioning.force_regenerate = true;
        }
        if let Some(limit) = self.limit_per_folder {
            captioning.limit_per_folder = limit;
        }
    }
}

#[derive(Args, Debug)]
pub struct PackArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Where the `wds_<split>_<suffix>` folders go. Defaults to the dataset root.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Samples per shard.
    #[arg(long, default_value = "8000")]
    pub max_per_shard: NonZeroUsize,

    /// Stop each folder after this many written samples.
    #[arg(long)]
    pub max_total_samples: Option<NonZeroUsize>,

    /// Store image and mask side by side in one png instead of two files.
    #[arg(long, action)]
    pub concat: bool,

    /// Look up images under the full mask name instead of dropping its last
    /// `_` token.
    #[arg(long, action)]
    pub exact_image_stem: bool,
}

impl PackArgs {
    #[must_use]
    pub fn options(&self, dataset_root: &Path) -> PackOptions {
        PackOptions {
            out_root: self
                .out_dir
                .clone()
                .unwrap_or_else(|| dataset_root.to_path_buf()),
            max_per_shard: self.max_per_shard.get(),
            max_total_samples: self.max_total_samples.map(NonZeroUsize::get),
            layout: if self.concat {
                SampleLayout::Concat
            } else {
                SampleLayout::Separate
            },
            image_stem_rule: if self.exact_image_stem {
                ImageStemRule::Exact
            } else {
                ImageStemRule::DropLastUnderscore
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Root directory to scan recursively.
    pub root: PathBuf,

    /// Show what would happen without changing anything.
    #[arg(long, action)]
    pub dry_run: bool,

    /// Also convert .jpg/.jpeg to .png.
    #[arg(long, action)]
    pub include_jpg: bool,

    /// Also convert .bmp to .png.
    #[arg(long, action)]
    pub include_bmp: bool,

    /// Also convert .tif/.tiff to .png.
    #[arg(long, action)]
    pub include_tiff: bool,

    /// Leave files alone whose converted counterpart already exists.
    #[arg(long, action)]
    pub skip_if_exists: bool,
}

impl From<&ConvertArgs> for ConvertOptions {
    fn from(args: &ConvertArgs) -> Self {
        Self {
            include_jpg: args.include_jpg,
            include_bmp: args.include_bmp,
            include_tiff: args.include_tiff,
            dry_run: args.dry_run,
            skip_if_exists: args.skip_if_exists,
        }
    }
}
