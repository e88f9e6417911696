use crate::utils;
use color_eyre::eyre::{Context, Result, bail};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// A builder for single-input `FFmpeg` transcodes.
pub struct FfmpegCommand {
    input: PathBuf,
    filters: Vec<String>,
    outputs: Vec<OsString>,
}

impl FfmpegCommand {
    pub fn new(input: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            filters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Rounds width and height down to even numbers, which yuv420p requires.
    #[must_use]
    pub fn even_dimensions(mut self) -> Self {
        self.filters
            .push("scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string());
        self
    }

    /// Writes a widely playable H.264 mp4 with the index at the front.
    #[must_use]
    pub fn mp4_output(mut self, out_path: &Path) -> Self {
        self.outputs.extend([
            "-movflags".into(),
            "+faststart".into(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            utils::path_to_os_string(out_path),
        ]);
        self
    }

    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-y".into(),
            "-i".into(),
            utils::path_to_os_string(&self.input),
        ];
        if !self.filters.is_empty() {
            args.push("-vf".into());
            args.push(self.filters.join(",").into());
        }
        args.extend(self.outputs.iter().cloned());
        args
    }

    /// Builds and runs the `FFmpeg` command.
    pub async fn run(self) -> Result<()> {
        if self.outputs.is_empty() {
            return Ok(()); // Nothing to do
        }
        run_ffmpeg(&self.args()).await
    }
}

async fn run_ffmpeg<S: AsRef<OsStr> + Send + Sync>(args: &[S]) -> Result<()> {
    let output = Command::new("ffmpeg")
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .context("failed to run ffmpeg (is it installed and on PATH?)")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffmpeg failed: {}", stderr.trim());
    }
    Ok(())
}

/// Whether an `ffmpeg` binary can be started.
pub async fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|status| status.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gif_to_mp4_arguments() {
        let cmd = FfmpegCommand::new(Path::new("/in/anim.gif"))
            .even_dimensions()
            .mp4_output(Path::new("/in/anim.mp4"));

        let args: Vec<String> = cmd
            .args()
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "-hide_banner",
                "-loglevel",
                "error",
                "-y",
                "-i",
                "/in/anim.gif",
                "-vf",
                "scale=trunc(iw/2)*2:trunc(ih/2)*2",
                "-movflags",
                "+faststart",
                "-pix_fmt",
                "yuv420p",
                "/in/anim.mp4",
            ]
        );
    }
}
