use color_eyre::eyre::{Context, Result};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::path::Path;

/// Re-encodes any supported image as PNG. Images with an alpha channel become
/// RGBA, everything else RGB.
pub fn convert_image_to_png(src: &Path, dst: &Path) -> Result<()> {
    let img = ImageReader::open(src)?
        .with_guessed_format()?
        .decode()
        .wrap_err_with(|| format!("failed to decode {}", src.display()))?;

    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.into_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.into_rgb8())
    };

    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    img.save_with_format(dst, ImageFormat::Png)
        .wrap_err_with(|| format!("failed to write {}", dst.display()))?;
    Ok(())
}
