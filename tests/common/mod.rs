//! Common test utilities for immich-hass integration tests

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use async_trait::async_trait;
use immich_hass::{Config, FilterSpec, ImmichSettings, MediaConverter, MediaError, Result};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Build an in-memory zip archive with stored (uncompressed) entries
pub fn zip_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Configuration pointing at a mock server and a temporary publish directory
pub fn config_for(server_url: &str, publish_dir: &Path, filters: Vec<FilterSpec>) -> Config {
    Config {
        immich: ImmichSettings {
            url: server_url.to_string(),
            api_key: "integration-key".to_string(),
        },
        publish_dir: publish_dir.to_path_buf(),
        num_photos: 3,
        update_interval_minutes: 1,
        filters,
        ..Config::default()
    }
}

/// Sorted file names directly inside `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Converter that writes a marker file instead of running external tools
#[derive(Default)]
pub struct StubConverter {
    converted: Mutex<Vec<PathBuf>>,
    fail_images: bool,
}

impl StubConverter {
    /// Still-image conversion always fails; the video fallback still works
    pub fn without_image_support() -> Self {
        Self {
            fail_images: true,
            ..Self::default()
        }
    }

    /// Inputs that were converted successfully
    pub fn converted(&self) -> Vec<PathBuf> {
        self.converted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaConverter for StubConverter {
    async fn heic_to_jpeg(&self, input: &Path, output: &Path, _quality: u8) -> Result<()> {
        if self.fail_images {
            return Err(MediaError::ConversionFailed {
                path: input.to_path_buf(),
                reason: "no still-image decoder".to_string(),
            }
            .into());
        }
        std::fs::write(output, b"converted jpeg").unwrap();
        self.converted.lock().unwrap().push(input.to_path_buf());
        Ok(())
    }

    async fn heic_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        std::fs::write(output, b"converted mp4").unwrap();
        self.converted.lock().unwrap().push(input.to_path_buf());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
