//! Utility functions for file operations and path manipulation

use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Get a path that does not exist yet, close to the one requested
///
/// Returns `path` itself when nothing exists there. Otherwise a ` (n)` suffix is
/// inserted before the extension, counting up from 1.
///
/// # Examples
///
/// ```
/// use immich_hass::utils::unique_path;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/IMG_0001.jpg");
/// let unique = unique_path(path).unwrap();
/// // If /tmp/IMG_0001.jpg exists, returns /tmp/IMG_0001 (1).jpg
/// // If that exists too, returns /tmp/IMG_0001 (2).jpg, etc.
/// ```
pub fn unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let invalid = |reason: &str| {
        Error::filesystem(
            "pick a unique name for",
            path,
            io::Error::new(io::ErrorKind::InvalidInput, reason.to_string()),
        )
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| invalid("cannot extract file stem"))?;
    let extension = path.extension().and_then(|e| e.to_str());
    let parent = path
        .parent()
        .ok_or_else(|| invalid("cannot extract parent directory"))?;

    // Try adding (1), (2), (3), ... until we find a unique name
    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(Error::filesystem(
        "pick a unique name for",
        path,
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free name after {} attempts", MAX_RENAME_ATTEMPTS),
        ),
    ))
}

/// Lowercased file extension, if any
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Remove a file, treating "already gone" as success
///
/// Returns whether a file was actually removed.
pub async fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
