use app_state::to_posix_string;
use color_eyre::eyre::{Context, Result, bail};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// How a mask file name maps to the name of its source image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageStemRule {
    /// `p1_frame1_0_MRI_heart_left+ventricle.png` -> `p1_frame1_0_MRI_heart.png`
    #[default]
    DropLastUnderscore,
    /// Same stem as the mask.
    Exact,
}

/// What goes into a shard for one sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleLayout {
    /// `<key>.img.png`, `<key>.mask.png` and `<key>.txt`, images as stored on disk.
    #[default]
    Separate,
    /// `<key>.png` holding image and mask side by side, plus `<key>.txt`.
    Concat,
}

/// One record of a shard: each file is stored as `<key>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub key: String,
    pub files: Vec<(&'static str, Vec<u8>)>,
}

#[must_use]
pub fn image_path_for_mask(mask_path: &Path, image_dir: &Path, rule: ImageStemRule) -> PathBuf {
    let stem = mask_path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    let stem = match rule {
        ImageStemRule::DropLastUnderscore => stem.rsplit_once('_').map_or(&*stem, |(head, _)| head),
        ImageStemRule::Exact => &*stem,
    };
    image_dir.join(format!("{stem}.png"))
}

/// `sample-` plus 16 hex digits of blake3 over both paths, relative to
/// `base` so the key survives moving the dataset.
#[must_use]
pub fn stable_key(base: &Path, mask_path: &Path, image_path: &Path) -> String {
    let relative = |p: &Path| to_posix_string(p.strip_prefix(base).unwrap_or(p));
    let joined = format!("{}|{}", relative(mask_path), relative(image_path));
    let hex = blake3::hash(joined.as_bytes()).to_hex();
    format!("sample-{}", &hex[..16])
}

/// First non-empty line of a caption file, trimmed.
pub fn read_caption_line(path: &Path) -> Result<String> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read caption {}", path.display()))?;
    Ok(text.trim().lines().next().unwrap_or_default().trim().to_string())
}

/// Reads image, mask and caption into a sample.
///
/// # Errors
///
/// * A file cannot be read, or an image is not a png.
pub fn build_sample(
    key: String,
    image_path: &Path,
    mask_path: &Path,
    caption: String,
    layout: SampleLayout,
) -> Result<Sample> {
    let image = read_png(image_path)?;
    let mask = read_png(mask_path)?;
    let mut files = match layout {
        SampleLayout::Separate => vec![("img.png", image), ("mask.png", mask)],
        SampleLayout::Concat => vec![("png", concat_png(&image, &mask)?)],
    };
    files.push(("txt", caption.into_bytes()));
    Ok(Sample { key, files })
}

fn read_png(path: &Path) -> Result<Vec<u8>> {
    let bytes =
        std::fs::read(path).wrap_err_with(|| format!("failed to read {}", path.display()))?;
    match image::guess_format(&bytes) {
        Ok(ImageFormat::Png) => Ok(bytes),
        Ok(other) => bail!("{} is {other:?}, not png", path.display()),
        Err(e) => bail!("{} is not an image: {e}", path.display()),
    }
}

/// Image on the left, mask on the right. The mask is resized with nearest
/// neighbour sampling when the sizes differ so labels stay crisp.
fn concat_png(image: &[u8], mask: &[u8]) -> Result<Vec<u8>> {
    let image = image::load_from_memory_with_format(image, ImageFormat::Png)?.into_rgb8();
    let mut mask = image::load_from_memory_with_format(mask, ImageFormat::Png)?.into_rgb8();
    let (width, height) = image.dimensions();
    if mask.dimensions() != (width, height) {
        mask = imageops::resize(&mask, width, height, FilterType::Nearest);
    }

    let mut side_by_side = RgbImage::new(width * 2, height);
    imageops::replace(&mut side_by_side, &image, 0, 0);
    imageops::replace(&mut side_by_side, &mask, i64::from(width), 0);

    let mut png = Vec::new();
    DynamicImage::ImageRgb8(side_by_side).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}
