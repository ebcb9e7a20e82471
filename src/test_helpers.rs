//! Shared test fakes for unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::error::{Error, MediaError, RemoteError, Result};
use crate::immich::{PhotoServer, RemoteResult, SearchCriteria};
use crate::media::MediaConverter;
use crate::types::AssetId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Build an in-memory zip; names ending in `/` become directory entries
pub(crate) fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Requests a [`FakeServer`] has received
#[derive(Clone, Debug, Default)]
pub(crate) struct Calls {
    pub people: usize,
    pub random: Vec<SearchCriteria>,
    pub smart: Vec<(String, SearchCriteria)>,
    pub downloads: Vec<Vec<AssetId>>,
}

/// Scripted in-memory photo server
pub(crate) struct FakeServer {
    people: HashMap<String, String>,
    random_ids: Vec<AssetId>,
    smart_ids: Vec<AssetId>,
    archive: Vec<u8>,
    fail_people: bool,
    fail_searches: AtomicBool,
    fail_downloads: AtomicBool,
    panic_on_search: AtomicBool,
    calls: Mutex<Calls>,
}

fn scripted_failure(endpoint: &str) -> RemoteError {
    RemoteError::Status {
        endpoint: endpoint.to_string(),
        status: 500,
        body: "scripted failure".to_string(),
    }
}

fn to_ids<I, S>(ids: I) -> Vec<AssetId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().map(|s| AssetId::from(s.as_ref())).collect()
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            people: HashMap::new(),
            random_ids: Vec::new(),
            smart_ids: Vec::new(),
            archive: zip_bytes(&[]),
            fail_people: false,
            fail_searches: AtomicBool::new(false),
            fail_downloads: AtomicBool::new(false),
            panic_on_search: AtomicBool::new(false),
            calls: Mutex::new(Calls::default()),
        }
    }

    pub fn with_people<'a>(mut self, people: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.people = people
            .into_iter()
            .map(|(name, id)| (name.to_string(), id.to_string()))
            .collect();
        self
    }

    pub fn with_random_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.random_ids = to_ids(ids);
        self
    }

    pub fn with_smart_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.smart_ids = to_ids(ids);
        self
    }

    pub fn with_archive(mut self, archive: Vec<u8>) -> Self {
        self.archive = archive;
        self
    }

    pub fn failing_people(mut self) -> Self {
        self.fail_people = true;
        self
    }

    pub fn fail_searches(&self, fail: bool) {
        self.fail_searches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_search(&self, panic: bool) {
        self.panic_on_search.store(panic, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    fn check_search(&self, endpoint: &str) -> RemoteResult<()> {
        if self.panic_on_search.load(Ordering::SeqCst) {
            panic!("scripted panic in {endpoint}");
        }
        if self.fail_searches.load(Ordering::SeqCst) {
            return Err(scripted_failure(endpoint));
        }
        Ok(())
    }
}

#[async_trait]
impl PhotoServer for FakeServer {
    async fn list_people(&self) -> RemoteResult<HashMap<String, String>> {
        self.calls.lock().unwrap().people += 1;
        if self.fail_people {
            return Err(scripted_failure("/api/people"));
        }
        Ok(self.people.clone())
    }

    async fn search_random(&self, criteria: &SearchCriteria) -> RemoteResult<Vec<AssetId>> {
        self.calls.lock().unwrap().random.push(criteria.clone());
        self.check_search("/api/search/random")?;
        Ok(self.random_ids.iter().take(criteria.size).cloned().collect())
    }

    async fn search_smart(
        &self,
        query: &str,
        criteria: &SearchCriteria,
    ) -> RemoteResult<Vec<AssetId>> {
        self.calls
            .lock()
            .unwrap()
            .smart
            .push((query.to_string(), criteria.clone()));
        self.check_search("/api/search/smart")?;
        Ok(self.smart_ids.iter().take(criteria.size).cloned().collect())
    }

    async fn download_archive(&self, asset_ids: &[AssetId]) -> RemoteResult<Vec<u8>> {
        self.calls.lock().unwrap().downloads.push(asset_ids.to_vec());
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(scripted_failure("/api/download/archive"));
        }
        Ok(self.archive.clone())
    }
}

/// Converter with scripted success per conversion kind
///
/// Successful conversions write a small placeholder file to the output path.
pub(crate) struct ScriptedConverter {
    image_ok: bool,
    video_ok: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedConverter {
    fn new(image_ok: bool, video_ok: bool) -> Self {
        Self {
            image_ok,
            video_ok,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Still-image conversion succeeds
    pub fn working() -> Self {
        Self::new(true, true)
    }

    /// Still-image conversion fails, video succeeds
    pub fn video_only() -> Self {
        Self::new(false, true)
    }

    /// Both conversions fail
    pub fn failing() -> Self {
        Self::new(false, false)
    }

    /// Conversions attempted, as `"<kind>:<file name>"`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &str, input: &Path) {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(format!("{kind}:{name}"));
    }

    fn finish(ok: bool, kind: &str, input: &Path, output: &Path) -> Result<()> {
        if !ok {
            return Err(Error::Media(MediaError::ConversionFailed {
                path: input.to_path_buf(),
                reason: format!("scripted {kind} failure"),
            }));
        }
        std::fs::write(output, kind).map_err(|e| Error::filesystem("write", output, e))
    }
}

#[async_trait]
impl MediaConverter for ScriptedConverter {
    async fn heic_to_jpeg(&self, input: &Path, output: &Path, _quality: u8) -> Result<()> {
        self.record("jpeg", input);
        Self::finish(self.image_ok, "jpeg", input, output)
    }

    async fn heic_to_mp4(&self, input: &Path, output: &Path) -> Result<()> {
        self.record("mp4", input);
        Self::finish(self.video_ok, "mp4", input, output)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
