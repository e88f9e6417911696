use crate::sample::Sample;
use color_eyre::eyre::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

type Archive = tar::Builder<BufWriter<File>>;

/// Writes samples into numbered tar files `<prefix>-000000.tar`,
/// `<prefix>-000001.tar`, ... with at most `max_count` samples each.
/// Entry headers carry no timestamps, so packing the same samples twice
/// produces identical bytes.
pub struct ShardWriter {
    dir: PathBuf,
    prefix: String,
    max_count: usize,
    current: Option<Archive>,
    in_current: usize,
    shards: Vec<PathBuf>,
}

impl ShardWriter {
    pub fn new(dir: &Path, prefix: &str, max_count: usize) -> Result<Self> {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
            max_count: max_count.max(1),
            current: None,
            in_current: 0,
            shards: Vec::new(),
        })
    }

    #[must_use]
    pub fn shard_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}-{index:06}.tar", self.prefix))
    }

    /// Deletes shards with this writer's prefix left over from an earlier run.
    pub fn remove_existing(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            if name.is_some_and(|n| {
                n.starts_with(&format!("{}-", self.prefix)) && n.ends_with(".tar")
            }) {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn write(&mut self, sample: &Sample) -> Result<()> {
        let archive = self.open_shard()?;
        for (extension, data) in &sample.files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);
            archive.append_data(
                &mut header,
                format!("{}.{extension}", sample.key),
                data.as_slice(),
            )?;
        }
        self.in_current += 1;
        Ok(())
    }

    /// Closes the last shard and returns the paths of all shards written.
    pub fn finish(mut self) -> Result<Vec<PathBuf>> {
        self.close_shard()?;
        Ok(self.shards)
    }

    fn open_shard(&mut self) -> Result<&mut Archive> {
        if self.in_current >= self.max_count {
            self.close_shard()?;
        }
        if let Some(archive) = self.current.take() {
            return Ok(self.current.insert(archive));
        }

        let path = self.shard_path(self.shards.len());
        let file =
            File::create(&path).wrap_err_with(|| format!("failed to create {}", path.display()))?;
        debug!("Opened shard {}", path.display());
        self.shards.push(path);
        Ok(self.current.insert(tar::Builder::new(BufWriter::new(file))))
    }

    fn close_shard(&mut self) -> Result<()> {
        if let Some(archive) = self.current.take() {
            archive.into_inner()?.flush()?;
        }
        self.in_current = 0;
        Ok(())
    }
}
