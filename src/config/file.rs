//! YAML settings file (`settings.yaml`)

use super::{Config, FilterSpec, LogLevel, SelectorKind};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk shape of the settings file
///
/// Every field is optional; absent fields keep the value from the lower
/// precedence layer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub immich: Option<ImmichSection>,

    /// Publish directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hass_img_path: Option<PathBuf>,

    /// Assets per cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_photos: Option<usize>,

    /// Minutes between cycles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_interval_minutes: Option<u64>,

    /// Log level name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Either a list of filter sets or a single (legacy) filter map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FiltersSection>,
}

/// `immich:` section of the settings file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImmichSection {
    /// Server base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// `filters:` is a list in current files and a single map in older ones
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FiltersSection {
    /// Several named filter sets, used round-robin
    Many(Vec<FilterEntry>),
    /// One unnamed filter set (legacy format)
    Single(FilterEntry),
}

/// A filter set as written in the settings file (name optional)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FilterEntry {
    /// Label; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Selection strategy
    #[serde(default)]
    pub selector_type: SelectorKind,

    /// Free-text query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,

    /// Pool size for smart-rng
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_search_results: Option<u32>,

    /// City filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// People filter (display names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people: Vec<String>,

    /// Lower time bound
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::timestamp_serde"
    )]
    pub taken_after: Option<DateTime<Utc>>,

    /// Upper time bound
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "super::timestamp_serde"
    )]
    pub taken_before: Option<DateTime<Utc>>,
}

impl FilterEntry {
    fn into_spec(self, fallback_name: String) -> FilterSpec {
        FilterSpec {
            name: self.name.unwrap_or(fallback_name),
            selector_kind: self.selector_type,
            search_query: self.search_query,
            max_search_results: self.max_search_results,
            city: self.city,
            people: self.people,
            taken_after: self.taken_after,
            taken_before: self.taken_before,
        }
    }
}

impl From<&FilterSpec> for FilterEntry {
    fn from(spec: &FilterSpec) -> Self {
        Self {
            name: Some(spec.name.clone()),
            selector_type: spec.selector_kind,
            search_query: spec.search_query.clone(),
            max_search_results: spec.max_search_results,
            city: spec.city.clone(),
            people: spec.people.clone(),
            taken_after: spec.taken_after,
            taken_before: spec.taken_before,
        }
    }
}

impl FiltersSection {
    /// Convert to filter specs, naming unnamed entries
    ///
    /// List entries without a name become `filter-<n>` (1-based); a single legacy
    /// map becomes `default`.
    pub fn into_specs(self) -> Vec<FilterSpec> {
        match self {
            FiltersSection::Many(entries) => entries
                .into_iter()
                .enumerate()
                .map(|(idx, entry)| entry.into_spec(format!("filter-{}", idx + 1)))
                .collect(),
            FiltersSection::Single(entry) => vec![entry.into_spec("default".to_string())],
        }
    }
}

impl ConfigFile {
    /// Overlay the values present in the file onto `config`
    pub fn apply_to(self, config: &mut Config) -> Result<()> {
        if let Some(immich) = self.immich {
            if let Some(url) = immich.url {
                config.immich.url = url;
            }
            if let Some(api_key) = immich.api_key {
                config.immich.api_key = api_key;
            }
        }
        if let Some(dir) = self.hass_img_path {
            config.publish_dir = dir;
        }
        if let Some(n) = self.num_photos {
            config.num_photos = n;
        }
        if let Some(minutes) = self.update_interval_minutes {
            config.update_interval_minutes = minutes;
        }
        if let Some(level) = self.log_level {
            config.log_level = level
                .parse::<LogLevel>()
                .map_err(|e| Error::config("log_level", e))?;
        }
        if let Some(section) = self.filters {
            let specs = section.into_specs();
            // An empty list keeps the built-in default filter set
            if !specs.is_empty() {
                config.filters = specs;
            }
        }
        Ok(())
    }
}

impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        Self {
            immich: Some(ImmichSection {
                url: Some(config.immich.url.clone()),
                api_key: Some(config.immich.api_key.clone()),
            }),
            hass_img_path: Some(config.publish_dir.clone()),
            num_photos: Some(config.num_photos),
            update_interval_minutes: Some(config.update_interval_minutes),
            log_level: Some(String::from(config.log_level)),
            filters: Some(FiltersSection::Many(
                config.filters.iter().map(FilterEntry::from).collect(),
            )),
        }
    }
}

/// Read the settings file, returning `None` when it does not exist or is empty
pub fn load_yaml(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.exists() {
        debug!(?path, "settings file not found, skipping");
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::filesystem("read settings file", path, e))?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    let file: ConfigFile = serde_yaml::from_str(&content).map_err(|e| Error::Config {
        message: format!("failed to parse {}: {}", path.display(), e),
        key: None,
    })?;

    debug!(?path, "loaded settings file");
    Ok(Some(file))
}

/// Write `config` to `path` in the settings-file format
pub fn save_yaml(config: &Config, path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(&ConfigFile::from(config)).map_err(|e| Error::Config {
        message: format!("failed to serialize configuration: {e}"),
        key: None,
    })?;
    std::fs::write(path, yaml).map_err(|e| Error::filesystem("write settings file", path, e))
}
