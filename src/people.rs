//! Display-name → person-id lookup
//!
//! Filter sets name people by display name; the server filters by id. The
//! directory is fetched once at startup and then only read.

use crate::error::Result;
use crate::immich::PhotoServer;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Person directory fetched from the photo server
#[derive(Clone, Debug, Default)]
pub struct PersonDirectory {
    by_name: HashMap<String, String>,
}

impl PersonDirectory {
    /// Build from a name → id map, dropping entries with an empty name
    pub fn new(people: HashMap<String, String>) -> Self {
        let by_name = people
            .into_iter()
            .filter(|(name, _)| !name.trim().is_empty())
            .collect();
        Self { by_name }
    }

    /// Fetch the directory from the server
    ///
    /// # Errors
    /// Fails if the server cannot be reached or answers with an error.
    pub async fn fetch(server: &dyn PhotoServer) -> Result<Self> {
        let directory = Self::new(server.list_people().await?);
        info!(people = directory.len(), "loaded person directory");
        Ok(directory)
    }

    /// Number of named people
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no named people are known
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Id of the person with exactly this display name
    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    /// Resolve display names to ids, in input order
    ///
    /// Unknown names are logged and dropped; the remaining ids are still used.
    pub fn resolve(&self, names: &[String]) -> Vec<String> {
        let mut ids = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();

        for name in names {
            match self.id_of(name) {
                Some(id) => ids.push(id.to_string()),
                None => unknown.push(name.as_str()),
            }
        }

        if !unknown.is_empty() {
            warn!(?unknown, "people not found on server, ignoring them");
            let mut known: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
            known.sort_unstable();
            debug!(?known, "known people");
        }

        ids
    }
}
