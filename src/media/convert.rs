//! HEIC conversion backends

use crate::error::{Error, MediaError, Result};
use crate::utils::remove_file_if_exists;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt kept in a conversion error
const MAX_STDERR_CHARS: usize = 400;

/// Converts HEIC-family containers into displayable formats
///
/// Implementations write `output` atomically: either the complete file appears
/// at `output` or nothing does.
#[async_trait]
pub trait MediaConverter: Send + Sync {
    /// Decode the primary still image and re-encode it as JPEG
    async fn heic_to_jpeg(&self, input: &Path, output: &Path, quality: u8) -> Result<()>;

    /// Transcode the container's image sequence to an MP4 video
    async fn heic_to_mp4(&self, input: &Path, output: &Path) -> Result<()>;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}

/// Converter backed by the `heif-convert` (libheif) and `ffmpeg` binaries
///
/// Either binary may be absent; the matching conversion then fails with
/// [`Error::NotSupported`].
#[derive(Clone, Debug)]
pub struct CliMediaConverter {
    heif_convert: Option<PathBuf>,
    ffmpeg: Option<PathBuf>,
}

impl CliMediaConverter {
    /// Create a converter with explicit binary paths
    pub fn new(heif_convert: Option<PathBuf>, ffmpeg: Option<PathBuf>) -> Self {
        Self {
            heif_convert,
            ffmpeg,
        }
    }

    /// Look both binaries up on `PATH`
    ///
    /// Returns `None` when neither is installed.
    pub fn from_path() -> Option<Self> {
        let heif_convert = which::which("heif-convert").ok();
        let ffmpeg = which::which("ffmpeg").ok();
        if heif_convert.is_none() && ffmpeg.is_none() {
            return None;
        }
        Some(Self::new(heif_convert, ffmpeg))
    }

    /// Path of the still-image converter, if available
    pub fn heif_convert_path(&self) -> Option<&Path> {
        self.heif_convert.as_deref()
    }

    /// Path of the video transcoder, if available
    pub fn ffmpeg_path(&self) -> Option<&Path> {
        self.ffmpeg.as_deref()
    }
}

/// Temporary sibling of `output` keeping its extension (`IMG.jpg` → `IMG.tmp.jpg`)
///
/// The tools pick their output format from the extension.
fn temp_sibling(output: &Path) -> PathBuf {
    match output.extension().and_then(|e| e.to_str()) {
        Some(ext) => output.with_extension(format!("tmp.{}", ext)),
        None => output.with_extension("tmp"),
    }
}

/// Run `binary` with `args` followed by the temp output path, then move the
/// result into place
async fn run_tool(binary: &Path, args: Vec<OsString>, input: &Path, output: &Path) -> Result<()> {
    let tmp = temp_sibling(output);
    let tool = binary
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| binary.display().to_string());

    debug!(%tool, ?input, ?output, "running converter");

    let failed = |reason: String| {
        Error::Media(MediaError::ConversionFailed {
            path: input.to_path_buf(),
            reason,
        })
    };

    let result = Command::new(binary)
        .args(&args)
        .arg(&tmp)
        .kill_on_drop(true)
        .output()
        .await;

    let outcome = match result {
        Err(e) => Err(failed(format!("failed to execute {}: {}", tool, e))),
        Ok(out) if !out.status.success() => {
            let stderr = String::from_utf8_lossy(&out.stderr);
            let excerpt: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            Err(failed(format!("{} exited with {}: {}", tool, out.status, excerpt)))
        }
        Ok(_) if !tmp.exists() => Err(failed(format!("{} produced no output", tool))),
        Ok(_) => tokio::fs::rename(&tmp, output)
            .await
            .map_err(|e| Error::filesystem("move converted file", output, e)),
    };

    if outcome.is_err() {
        // Partial output must not end up published
        match remove_file_if_exists(&tmp).await {
            Ok(true) => debug!(path = ?tmp, "removed partial conversion output"),
            Ok(false) => {}
            Err(e) => debug!(path = ?tmp, error = %e, "could not remove partial conversion output"),
        }
    }
    outcome
}

#[async_trait]
impl MediaConverter for CliMediaConverter {
    async fn heic_to_jpeg(&self, input: &Path, output: &Path, quality: u8) -> Result<()> {
        let binary = self.heif_convert.as_deref().ok_or_else(|| {
            Error::NotSupported("HEIC image conversion requires heif-convert in PATH".into())
        })?;
        let args = vec![
            OsString::from("-q"),
            OsString::from(quality.to_string()),
            input.as_os_str().to_os_string(),
        ];
        run_tool(binary, args, input, output).await
    }

    async fn heic_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        let binary = self.ffmpeg.as_deref().ok_or_else(|| {
            Error::NotSupported("HEIC video conversion requires ffmpeg in PATH".into())
        })?;
        let mut args: Vec<OsString> = ["-y", "-loglevel", "error", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(input.as_os_str().to_os_string());
        args.extend(
            [
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ]
            .into_iter()
            .map(OsString::from),
        );
        run_tool(binary, args, input, output).await
    }

    fn name(&self) -> &'static str {
        "cli"
    }
}

/// Converter used when no conversion tool is installed
///
/// Every conversion fails with [`Error::NotSupported`], so HEIC files are
/// skipped while JPEG/PNG/video files are still published.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMediaConverter;

#[async_trait]
impl MediaConverter for NoOpMediaConverter {
    async fn heic_to_jpeg(&self, _input: &Path, _output: &Path, _quality: u8) -> Result<()> {
        Err(Error::NotSupported(
            "HEIC image conversion requires heif-convert. \
             Install libheif tools or ensure heif-convert is in PATH."
                .into(),
        ))
    }

    async fn heic_to_mp4(&self, _input: &Path, _output: &Path) -> Result<()> {
        Err(Error::NotSupported(
            "HEIC video conversion requires ffmpeg. Ensure ffmpeg is in PATH.".into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
