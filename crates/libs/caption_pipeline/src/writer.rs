use crate::error::ItemError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Writes `caption` plus a trailing newline to `path`, creating the caption
/// folder if needed. The text goes to a hidden sibling first and is renamed
/// into place, so a reader never sees a half-written caption.
///
/// # Errors
///
/// * The folder cannot be created, or the file cannot be written or renamed.
pub async fn write_caption(path: &Path, caption: &str) -> Result<(), ItemError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ItemError::Io { path, source }
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err(parent))?;
    }

    let tmp = temp_sibling(path);
    fs::write(&tmp, format!("{caption}\n"))
        .await
        .map_err(io_err(tmp.as_path()))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(io_err(path)(e));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::Result;

    #[tokio::test]
    async fn writes_caption_and_creates_folder() -> Result<()> {
        // ARRANGE
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("train_caption").join("a_CT_liver_liver.txt");

        // ACT
        write_caption(&path, "Segment the liver.").await?;

        // ASSERT
        assert_eq!(std::fs::read_to_string(&path)?, "Segment the liver.\n");
        let leftovers = std::fs::read_dir(dir.path().join("train_caption"))?.count();
        assert_eq!(leftovers, 1);
        Ok(())
    }

    #[tokio::test]
    async fn overwrites_existing_caption() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("x.txt");
        std::fs::write(&path, "old words that are stale")?;

        write_caption(&path, "New caption.").await?;

        assert_eq!(std::fs::read_to_string(&path)?, "New caption.\n");
        Ok(())
    }

    #[test]
    fn temp_file_is_hidden_sibling() {
        assert_eq!(
            temp_sibling(Path::new("/a/train_caption/x.txt")),
            Path::new("/a/train_caption/.x.txt.tmp")
        );
    }
}
