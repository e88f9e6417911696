//! # Media Conversion Crate
//!
//! Normalises dataset media in place before captioning:
//!
//! - `.webp` images (and optionally `.jpg`/`.jpeg`, `.bmp`, `.tif`/`.tiff`) are
//!   re-encoded as `.png`.
//! - `.gif` animations are transcoded to `.mp4` with `FFmpeg`.
//!
//! Originals are deleted once their replacement exists. Other videos are
//! counted but left alone.

mod ffmpeg;
mod photo;
mod utils;

pub use ffmpeg::{FfmpegCommand, ffmpeg_available};

use color_eyre::eyre::{Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};
use temp_dir::TempDir;
use tracing::{info, warn};
use walkdir::WalkDir;

const VIDEO_EXTENSIONS: [&str; 8] = [
    ".mp4", ".mov", ".mkv", ".avi", ".webm", ".m4v", ".mpg", ".mpeg",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub include_jpg: bool,
    pub include_bmp: bool,
    pub include_tiff: bool,
    /// Only report what would happen.
    pub dry_run: bool,
    /// Leave a file alone when its converted counterpart already exists.
    pub skip_if_exists: bool,
}

impl ConvertOptions {
    fn image_extensions(&self) -> Vec<&'static str> {
        let mut exts = vec![".webp"];
        if self.include_jpg {
            exts.extend([".jpg", ".jpeg"]);
        }
        if self.include_bmp {
            exts.push(".bmp");
        }
        if self.include_tiff {
            exts.extend([".tif", ".tiff"]);
        }
        exts
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertStats {
    pub images_found: usize,
    pub gifs_found: usize,
    pub videos_found: usize,
    pub images_converted: usize,
    pub gifs_converted: usize,
    pub images_deleted: usize,
    pub gifs_deleted: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

impl fmt::Display for ConvertStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Images found:     {}", self.images_found)?;
        writeln!(f, "Gifs found:       {}", self.gifs_found)?;
        writeln!(f, "Videos found:     {}", self.videos_found)?;
        writeln!(f, "Images converted: {}", self.images_converted)?;
        writeln!(f, "Gifs converted:   {}", self.gifs_converted)?;
        writeln!(f, "Images deleted:   {}", self.images_deleted)?;
        writeln!(f, "Gifs deleted:     {}", self.gifs_deleted)?;
        writeln!(f, "Skipped existing: {}", self.skipped_existing)?;
        write!(f, "Failed:           {}", self.failed)
    }
}

/// Files under a root, grouped by what will happen to them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MediaScan {
    pub images: Vec<PathBuf>,
    pub gifs: Vec<PathBuf>,
    pub videos: Vec<PathBuf>,
}

/// Recursively collects convertible media under `root`, sorted by path.
#[must_use]
pub fn scan_media(root: &Path, options: &ConvertOptions) -> MediaScan {
    let image_exts = options.image_extensions();
    let mut scan = MediaScan::default();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.into_path();
        let Some(ext) = utils::dotted_extension(&path) else {
            continue;
        };
        if image_exts.contains(&ext.as_str()) {
            scan.images.push(path);
        } else if ext == ".gif" {
            scan.gifs.push(path);
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            scan.videos.push(path);
        }
    }
    scan
}

/// Converts every matching file under `root` and deletes the originals.
/// Individual failures are logged and counted; they do not stop the run.
///
/// # Errors
///
/// * `root` does not exist or is not a directory.
pub async fn convert_tree(root: &Path, options: &ConvertOptions) -> Result<ConvertStats> {
    if !root.is_dir() {
        bail!("Path does not exist or is not a directory: {}", root.display());
    }

    let scan = scan_media(root, options);
    let mut stats = ConvertStats {
        images_found: scan.images.len(),
        gifs_found: scan.gifs.len(),
        videos_found: scan.videos.len(),
        ..ConvertStats::default()
    };
    info!(
        "Scanning {}: {} images -> png, {} gifs -> mp4, {} other videos left as is",
        root.display(),
        stats.images_found,
        stats.gifs_found,
        stats.videos_found
    );
    if options.dry_run {
        info!("Dry run: no files will be changed");
    }

    for src in &scan.images {
        convert_one(src, "png", MediaKind::Image, options, &mut stats).await;
    }
    for src in &scan.gifs {
        convert_one(src, "mp4", MediaKind::Gif, options, &mut stats).await;
    }

    if stats.gifs_found > 0 && !ffmpeg_available().await {
        warn!("ffmpeg not found. GIF -> MP4 conversions fail until ffmpeg is installed.");
    }
    Ok(stats)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Image,
    Gif,
}

async fn convert_one(
    src: &Path,
    new_ext: &str,
    kind: MediaKind,
    options: &ConvertOptions,
    stats: &mut ConvertStats,
) {
    let dst = src.with_extension(new_ext);
    if options.skip_if_exists && dst.exists() {
        stats.skipped_existing += 1;
        return;
    }
    info!("[{kind:?}] {} -> {}", src.display(), dst.display());
    if options.dry_run {
        return;
    }

    let result = match kind {
        MediaKind::Image => convert_image(src, &dst).await,
        MediaKind::Gif => convert_gif(src, &dst).await,
    };
    if let Err(e) = result {
        stats.failed += 1;
        warn!("Failed to convert {}: {e:#}", src.display());
        return;
    }

    match kind {
        MediaKind::Image => stats.images_converted += 1,
        MediaKind::Gif => stats.gifs_converted += 1,
    }
    if dst.exists() {
        match tokio::fs::remove_file(src).await {
            Ok(()) => match kind {
                MediaKind::Image => stats.images_deleted += 1,
                MediaKind::Gif => stats.gifs_deleted += 1,
            },
            Err(e) => warn!("Converted but could not delete {}: {e}", src.display()),
        }
    }
}

/// Converts into a temporary directory first so a failed conversion never
/// leaves a partial file next to the original.
async fn convert_image(src: &Path, dst: &Path) -> Result<()> {
    let temp_dir = TempDir::new()?;
    let staged = temp_dir.child("converted.png");
    let (src_owned, staged_owned) = (src.to_path_buf(), staged.clone());
    tokio::task::spawn_blocking(move || photo::convert_image_to_png(&src_owned, &staged_owned))
        .await??;
    utils::move_file(&staged, dst).await?;
    temp_dir.cleanup()?;
    Ok(())
}

async fn convert_gif(src: &Path, dst: &Path) -> Result<()> {
    let temp_dir = TempDir::new()?;
    let staged = temp_dir.child("converted.mp4");
    FfmpegCommand::new(src)
        .even_dimensions()
        .mp4_output(&staged)
        .run()
        .await?;
    utils::move_file(&staged, dst).await?;
    temp_dir.cleanup()?;
    Ok(())
}
