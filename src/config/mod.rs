//! Configuration types for immich-hass
//!
//! [`Config`] is the single, already-validated structure the refresh pipeline
//! consumes. It is assembled by [`load`] from (highest precedence first)
//! command-line flags, environment variables, the YAML settings file, and the
//! built-in defaults.

mod cli;
mod file;

pub use cli::Args;
pub use file::{ConfigFile, FilterEntry, FiltersSection, ImmichSection, load_yaml, save_yaml};

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Pool size requested by the smart-rng selector when none is configured
pub const DEFAULT_MAX_SEARCH_RESULTS: u32 = 250;

/// Largest page the server accepts for a smart search
pub const MAX_SEARCH_RESULTS_LIMIT: u32 = 1000;

/// Name given to the filter set built from command-line / environment overrides
pub const OVERRIDE_FILTER_NAME: &str = "command-line";

/// Photo server connection settings
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ImmichSettings {
    /// Base URL of the server (e.g., "https://photos.example.com")
    pub url: String,
    /// API key sent as `x-api-key`
    pub api_key: String,
}

impl std::fmt::Debug for ImmichSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.api_key.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("ImmichSettings")
            .field("url", &self.url)
            .field("api_key", &key)
            .finish()
    }
}

/// How a filter set turns into asset ids
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorKind {
    /// Server-side random search
    #[default]
    Random,
    /// Free-text (CLIP) search, results in server order
    Smart,
    /// Free-text search over a larger pool, resampled locally
    SmartRng,
}

impl SelectorKind {
    /// Name as written in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::Random => "random",
            SelectorKind::Smart => "smart",
            SelectorKind::SmartRng => "smart-rng",
        }
    }

    /// Whether this kind searches by free-text query
    pub fn uses_query(&self) -> bool {
        !matches!(self, SelectorKind::Random)
    }
}

impl std::fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(SelectorKind::Random),
            "smart" => Ok(SelectorKind::Smart),
            "smart-rng" | "smart_rng" => Ok(SelectorKind::SmartRng),
            other => Err(format!(
                "invalid selector type {other:?}; must be one of: random, smart, smart-rng"
            )),
        }
    }
}

/// Log verbosity, using the level names of the settings file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    /// Everything, including per-request details
    Debug,
    /// Cycle progress
    #[default]
    Info,
    /// Recoverable problems only
    Warning,
    /// Failures only
    Error,
    /// Alias of `Error`
    Critical,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, String> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

/// One named selection rule
///
/// Immutable once the configuration has been validated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Unique, human-readable label
    pub name: String,

    /// Which selection strategy to use
    #[serde(rename = "selector_type", default)]
    pub selector_kind: SelectorKind,

    /// Free-text query (required for smart kinds, forbidden for random)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,

    /// Candidate pool size for smart-rng (1..=1000, default 250)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_search_results: Option<u32>,

    /// Only assets taken in this city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Only assets showing these people (display names)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people: Vec<String>,

    /// Only assets taken at or after this instant
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp_serde"
    )]
    pub taken_after: Option<DateTime<Utc>>,

    /// Only assets taken before this instant
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "timestamp_serde"
    )]
    pub taken_before: Option<DateTime<Utc>>,
}

impl FilterSpec {
    /// A random filter set with no filters
    pub fn random(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector_kind: SelectorKind::Random,
            search_query: None,
            max_search_results: None,
            city: None,
            people: Vec::new(),
            taken_after: None,
            taken_before: None,
        }
    }

    /// A smart (or smart-rng) filter set searching for `query`
    pub fn smart(name: impl Into<String>, kind: SelectorKind, query: impl Into<String>) -> Self {
        Self {
            selector_kind: kind,
            search_query: Some(query.into()),
            ..Self::random(name)
        }
    }

    /// Pool size for smart-rng, falling back to the default
    pub fn effective_max_search_results(&self) -> u32 {
        self.max_search_results
            .unwrap_or(DEFAULT_MAX_SEARCH_RESULTS)
    }

    /// Check the per-filter invariants
    pub fn validate(&self) -> Result<()> {
        let key = |field: &str| format!("filters.{}.{}", self.name, field);

        if self.name.trim().is_empty() {
            return Err(Error::config("filters.name", "filter set name must not be empty"));
        }

        let has_query = self
            .search_query
            .as_deref()
            .is_some_and(|q| !q.trim().is_empty());

        if self.selector_kind.uses_query() && !has_query {
            return Err(Error::config(
                key("search_query"),
                format!(
                    "search_query is required when using the {} selector",
                    self.selector_kind
                ),
            ));
        }
        if !self.selector_kind.uses_query() && self.search_query.is_some() {
            return Err(Error::config(
                key("search_query"),
                "search_query must not be set when using the random selector",
            ));
        }

        if let Some(max) = self.max_search_results {
            if self.selector_kind != SelectorKind::SmartRng {
                return Err(Error::config(
                    key("max_search_results"),
                    "max_search_results can only be set when using the smart-rng selector",
                ));
            }
            if max == 0 || max > MAX_SEARCH_RESULTS_LIMIT {
                return Err(Error::config(
                    key("max_search_results"),
                    format!("max_search_results must be between 1 and {MAX_SEARCH_RESULTS_LIMIT}"),
                ));
            }
        }

        if let (Some(after), Some(before)) = (self.taken_after, self.taken_before) {
            if after >= before {
                return Err(Error::config(
                    key("taken_after"),
                    "taken_after must be earlier than taken_before",
                ));
            }
        }

        Ok(())
    }
}

impl std::fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Filter set '{}' using {} selector",
            self.name, self.selector_kind
        )?;
        if let Some(query) = &self.search_query {
            write!(f, " searching for \"{query}\"")?;
        }
        if let Some(city) = &self.city {
            write!(f, " in {city}")?;
        }
        if !self.people.is_empty() {
            write!(f, " with people {}", self.people.join(", "))?;
        }
        match (self.taken_after, self.taken_before) {
            (Some(after), Some(before)) => write!(
                f,
                " after {} and before {}",
                after.to_rfc3339(),
                before.to_rfc3339()
            )?,
            (Some(after), None) => write!(f, " after {}", after.to_rfc3339())?,
            (None, Some(before)) => write!(f, " before {}", before.to_rfc3339())?,
            (None, None) => {}
        }
        Ok(())
    }
}

/// Main configuration for the refresh pipeline
#[derive(Clone, Debug)]
pub struct Config {
    /// Photo server connection
    pub immich: ImmichSettings,

    /// Directory the dashboard reads from (default: "/config/www/immich")
    pub publish_dir: PathBuf,

    /// Assets requested per cycle (default: 10)
    pub num_photos: usize,

    /// Minutes between cycles (default: 60)
    pub update_interval_minutes: u64,

    /// Log verbosity (default: INFO)
    pub log_level: LogLevel,

    /// Filter sets, used round-robin (at least one)
    pub filters: Vec<FilterSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            immich: ImmichSettings::default(),
            publish_dir: default_publish_dir(),
            num_photos: default_num_photos(),
            update_interval_minutes: default_update_interval_minutes(),
            log_level: LogLevel::default(),
            filters: default_filters(),
        }
    }
}

impl Config {
    /// Interval between cycles as a `Duration`
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_minutes.saturating_mul(60))
    }

    /// Validate the fully merged configuration
    ///
    /// Rejects missing credentials, non-positive counts, an empty or ambiguous
    /// filter list, and any filter set violating its own invariants.
    pub fn validate(&self) -> Result<()> {
        if self.immich.url.trim().is_empty() {
            return Err(Error::config(
                "immich.url",
                "Immich URL is required but was not provided in any configuration source",
            ));
        }
        match url::Url::parse(&self.immich.url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                return Err(Error::config(
                    "immich.url",
                    "Immich URL must start with http:// or https://",
                ));
            }
        }
        if self.immich.api_key.trim().is_empty() {
            return Err(Error::config(
                "immich.api_key",
                "Immich API key is required but was not provided in any configuration source",
            ));
        }

        if self.num_photos == 0 {
            return Err(Error::config("num_photos", "num_photos must be positive"));
        }
        if self.update_interval_minutes == 0 {
            return Err(Error::config(
                "update_interval_minutes",
                "update_interval_minutes must be positive",
            ));
        }

        if self.filters.is_empty() {
            return Err(Error::config(
                "filters",
                "at least one filter set must be configured",
            ));
        }
        let mut seen = HashSet::new();
        for filter in &self.filters {
            if !seen.insert(filter.name.as_str()) {
                return Err(Error::config(
                    "filters",
                    format!("filter set names must be unique (duplicate: {:?})", filter.name),
                ));
            }
        }
        for filter in &self.filters {
            filter.validate()?;
        }

        Ok(())
    }
}

/// Load configuration from every source and validate it
///
/// Precedence, highest first: command-line flags, environment variables (bound to
/// the same flags), the YAML file named by `--config`, built-in defaults.
pub fn load(args: &Args) -> Result<Config> {
    let mut config = Config::default();

    if let Some(file) = load_yaml(&args.config)? {
        file.apply_to(&mut config)?;
    }
    args.apply_to(&mut config)?;

    config.validate()?;
    Ok(config)
}

/// Parse a timestamp in RFC 3339, `YYYY-MM-DDTHH:MM:SS`, or `YYYY-MM-DD` form
///
/// Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!(
        "invalid datetime format; expected ISO format (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS), got: {value}"
    ))
}

fn default_publish_dir() -> PathBuf {
    PathBuf::from("/config/www/immich")
}

fn default_num_photos() -> usize {
    10
}

fn default_update_interval_minutes() -> u64 {
    60
}

fn default_filters() -> Vec<FilterSpec> {
    vec![FilterSpec::random("default")]
}

// Optional timestamp helper accepting the relaxed formats of `parse_timestamp`
mod timestamp_serde {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_timestamp(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
