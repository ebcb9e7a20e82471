//! Per-file processing of extracted media

use super::convert::MediaConverter;
use super::{MediaKind, classify};
use crate::error::{Error, MediaError, Result};
use crate::utils::{lowercase_extension, remove_file_if_exists, unique_path};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// JPEG quality used when re-encoding HEIC stills
pub const JPEG_QUALITY: u8 = 95;

/// A file that made it through processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedFile {
    /// The extracted file
    pub source: PathBuf,
    /// The file to publish (same as `source` for pass-through files)
    pub output: PathBuf,
}

impl ProcessedFile {
    /// Whether a new file was produced from `source`
    pub fn was_converted(&self) -> bool {
        self.source != self.output
    }
}

/// Make one extracted file publishable
///
/// Images and videos pass through unchanged. HEIC containers are converted to
/// `<stem>.jpg` in `dest_dir`, falling back to `<stem>.mp4` when the still-image
/// conversion fails for any reason.
///
/// # Errors
/// [`MediaError::UnsupportedFormat`] for unknown extensions,
/// [`MediaError::ConversionFailed`] when both conversions fail.
pub async fn process_file(
    path: &Path,
    dest_dir: &Path,
    converter: &dyn MediaConverter,
) -> Result<PathBuf> {
    match classify(path) {
        MediaKind::Image | MediaKind::Video => Ok(path.to_path_buf()),
        MediaKind::HeicContainer => convert_heic(path, dest_dir, converter).await,
        MediaKind::Unsupported => Err(Error::Media(MediaError::UnsupportedFormat {
            path: path.to_path_buf(),
            extension: lowercase_extension(path).unwrap_or_default(),
        })),
    }
}

async fn convert_heic(
    path: &Path,
    dest_dir: &Path,
    converter: &dyn MediaConverter,
) -> Result<PathBuf> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "converted".to_string());

    let jpeg = unique_path(&dest_dir.join(format!("{}.jpg", stem)))?;
    let image_error = match converter.heic_to_jpeg(path, &jpeg, JPEG_QUALITY).await {
        Ok(()) => {
            debug!(?path, output = ?jpeg, converter = converter.name(), "converted HEIC still");
            return Ok(jpeg);
        }
        Err(e) => e,
    };

    debug!(
        ?path,
        error = %image_error,
        "still-image conversion failed, trying video"
    );

    let mp4 = unique_path(&dest_dir.join(format!("{}.mp4", stem)))?;
    match converter.heic_to_mp4(path, &mp4).await {
        Ok(()) => {
            debug!(?path, output = ?mp4, converter = converter.name(), "converted HEIC sequence");
            Ok(mp4)
        }
        Err(video_error) => Err(Error::Media(MediaError::ConversionFailed {
            path: path.to_path_buf(),
            reason: format!(
                "image conversion: {}; video conversion: {}",
                image_error, video_error
            ),
        })),
    }
}

/// Process extracted files one after another, in order
///
/// A file that fails is logged and skipped; the batch always runs to the end.
pub async fn process_batch(
    paths: &[PathBuf],
    dest_dir: &Path,
    converter: &dyn MediaConverter,
) -> Vec<ProcessedFile> {
    let mut processed = Vec::with_capacity(paths.len());

    for path in paths {
        match process_file(path, dest_dir, converter).await {
            Ok(output) => processed.push(ProcessedFile {
                source: path.clone(),
                output,
            }),
            Err(e) => warn!(?path, error = %e, "skipping file"),
        }
    }

    let converted = processed.iter().filter(|p| p.was_converted()).count();
    info!(
        total = paths.len(),
        published = processed.len(),
        converted,
        skipped = paths.len() - processed.len(),
        "processed extracted files"
    );
    processed
}

/// Delete the originals of converted files
///
/// Pass-through files are never touched. Returns how many originals were removed.
pub async fn remove_converted_originals(processed: &[ProcessedFile]) -> usize {
    let mut removed = 0;
    for file in processed.iter().filter(|p| p.was_converted()) {
        match remove_file_if_exists(&file.source).await {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => warn!(path = ?file.source, error = %e, "failed to remove converted original"),
        }
    }
    removed
}
