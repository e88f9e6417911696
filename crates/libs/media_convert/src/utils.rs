use color_eyre::eyre::Result;
use std::ffi::OsString;
use std::path::Path;
use tokio::fs;

/// Converts a `Path` to an `OsString` for use in command-line arguments.
pub fn path_to_os_string(p: &Path) -> OsString {
    p.as_os_str().to_owned()
}

/// Moves a file, falling back to copy and delete when `rename` cannot cross
/// filesystems.
pub async fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }
    if fs::rename(src, dst).await.is_err() {
        fs::copy(src, dst).await?;
        fs::remove_file(src).await?;
    }
    Ok(())
}

/// Lowercased extension with a leading dot, e.g. `.webp`.
pub fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}
