//! Media pipeline
//!
//! Turns a downloaded archive into files the dashboard can display:
//! - [`archive`]: flat extraction of the zip payload
//! - [`process`]: per-file pass-through or HEIC conversion
//! - [`convert`]: the converter backends (external tools or none)

pub mod archive;
pub mod convert;
pub mod process;

pub use archive::extract_archive;
pub use convert::{CliMediaConverter, MediaConverter, NoOpMediaConverter};
pub use process::{
    JPEG_QUALITY, ProcessedFile, process_batch, process_file, remove_converted_originals,
};

use crate::utils::lowercase_extension;
use std::path::Path;

/// Extensions published as-is (still images)
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extensions published as-is (videos)
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4"];

/// HEIC-family containers, converted before publishing
pub const HEIC_EXTENSIONS: &[&str] = &["heic", "heif"];

/// Media class of a file, decided by its extension alone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// Displayable still image
    Image,
    /// Displayable video
    Video,
    /// HEIC/HEIF container holding a still or a short clip
    HeicContainer,
    /// Anything else
    Unsupported,
}

impl MediaKind {
    /// Whether the publish directory owns files of this kind
    pub fn is_recognized(&self) -> bool {
        !matches!(self, MediaKind::Unsupported)
    }
}

/// Classify a file by its (case-insensitive) extension
pub fn classify(path: &Path) -> MediaKind {
    let Some(ext) = lowercase_extension(path) else {
        return MediaKind::Unsupported;
    };
    let ext = ext.as_str();

    if IMAGE_EXTENSIONS.contains(&ext) {
        MediaKind::Image
    } else if VIDEO_EXTENSIONS.contains(&ext) {
        MediaKind::Video
    } else if HEIC_EXTENSIONS.contains(&ext) {
        MediaKind::HeicContainer
    } else {
        MediaKind::Unsupported
    }
}
