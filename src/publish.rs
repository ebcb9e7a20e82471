//! Publish directory housekeeping
//!
//! The publish directory is shared with the dashboard. Only files with a
//! recognized media extension belong to us; everything else is left alone.

use crate::error::{Error, Result};
use crate::media::classify;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the per-cycle archive inside the publish directory
pub const ARCHIVE_FILE_NAME: &str = "photos.zip";

/// Where a cycle stores its downloaded archive
pub fn archive_path(publish_dir: &Path) -> PathBuf {
    publish_dir.join(ARCHIVE_FILE_NAME)
}

/// Make sure the publish directory exists
///
/// The parent must already exist; the directory itself is created if missing.
///
/// # Errors
/// Fails if the parent is missing or the directory cannot be created.
pub async fn prepare_publish_dir(dir: &Path) -> Result<()> {
    if let Some(parent) = dir.parent().filter(|p| !p.as_os_str().is_empty())
        && !tokio::fs::try_exists(parent).await.unwrap_or(false)
    {
        return Err(Error::config(
            "hass_img_path",
            format!(
                "parent directory {} of the publish directory does not exist",
                parent.display()
            ),
        ));
    }

    if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
        info!(?dir, "creating publish directory");
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::filesystem("create publish directory", dir, e))
}

/// Delete every recognized media file directly inside `dir`
///
/// Subdirectories and unrecognized files are never touched. A missing directory
/// is logged and treated as already clean. Returns the number of files removed.
pub async fn clean_publish_dir(dir: &Path) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(?dir, "publish directory does not exist, nothing to clean");
            return Ok(0);
        }
        Err(e) => return Err(Error::filesystem("read directory", dir, e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::filesystem("read directory", dir, e))?
    {
        let path = entry.path();
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file || !classify(&path).is_recognized() {
            continue;
        }

        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| Error::filesystem("delete stale file", &path, e))?;
        debug!(?path, "removed stale file");
        removed += 1;
    }

    info!(?dir, removed, "cleaned publish directory");
    Ok(removed)
}

/// Write the downloaded archive to disk
pub async fn save_archive(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| Error::filesystem("write archive", path, e))?;
    debug!(?path, bytes = bytes.len(), "saved archive");
    Ok(())
}
