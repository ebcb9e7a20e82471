//! Flat zip extraction

use crate::error::{Error, Result};
use crate::utils::unique_path;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Extract the zip at `archive_path` into `dest_dir`
///
/// Every regular file lands directly in `dest_dir`: directory components of
/// entry names are dropped and name collisions get a ` (n)` suffix. Returns the
/// written paths in archive order.
///
/// # Errors
/// [`Error::CorruptArchive`] if the archive cannot be parsed, a filesystem error
/// if a file cannot be written.
pub async fn extract_archive(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    let archive_owned = archive_path.to_path_buf();
    let dest_owned = dest_dir.to_path_buf();

    spawn_blocking(move || {
        let file = std::fs::File::open(&archive_owned)
            .map_err(|e| Error::filesystem("open archive", &archive_owned, e))?;
        extract_from(file, &archive_owned, &dest_owned)
    })
    .await
    .map_err(|e| Error::CorruptArchive {
        archive: archive_path.to_path_buf(),
        reason: format!("extraction task panicked: {}", e),
    })?
}

fn corrupt(archive: &Path, reason: impl std::fmt::Display) -> Error {
    Error::CorruptArchive {
        archive: archive.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Records whether the underlying writer failed, so copy errors can be told
/// apart from read errors
struct TrackedWriter<W> {
    inner: W,
    failed: bool,
}

impl<W> TrackedWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            failed: false,
        }
    }
}

impl<W: Write> Write for TrackedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let result = self.inner.write(buf);
        self.failed |= result.is_err();
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        let result = self.inner.flush();
        self.failed |= result.is_err();
        result
    }
}

fn extract_from<R: Read + Seek>(reader: R, label: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    debug!(archive = ?label, ?dest_dir, "extracting archive");

    std::fs::create_dir_all(dest_dir)
        .map_err(|e| Error::filesystem("create destination", dest_dir, e))?;

    let mut archive = zip::ZipArchive::new(reader)
        .map_err(|e| corrupt(label, format!("failed to read ZIP archive: {}", e)))?;

    let mut extracted = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| corrupt(label, format!("failed to read ZIP entry {}: {}", i, e)))?;

        if entry.is_dir() {
            continue;
        }

        // Only the final component is kept; unsafe names are dropped entirely
        let file_name = match entry.enclosed_name().and_then(|p| p.file_name()) {
            Some(name) => name.to_os_string(),
            None => {
                warn!(entry = entry.name(), "skipping entry with unsafe path");
                continue;
            }
        };

        let target = unique_path(&dest_dir.join(&file_name))?;
        let file = std::fs::File::create(&target)
            .map_err(|e| Error::filesystem("create extracted file", &target, e))?;
        let mut outfile = TrackedWriter::new(file);

        // Streamed: the declared entry size is not trusted
        if let Err(e) = io::copy(&mut entry, &mut outfile) {
            let write_failed = outfile.failed;
            drop(outfile);
            if let Err(cleanup) = std::fs::remove_file(&target) {
                debug!(path = ?target, error = %cleanup, "could not remove partial file");
            }
            return Err(if write_failed {
                Error::filesystem("write extracted file", &target, e)
            } else {
                corrupt(label, format!("failed to decompress {}: {}", entry.name(), e))
            });
        }
        extracted.push(target);
    }

    info!(
        archive = ?label,
        extracted_count = extracted.len(),
        "archive extracted"
    );
    Ok(extracted)
}
