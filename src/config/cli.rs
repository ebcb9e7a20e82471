//! Command-line flags, each also readable from an environment variable

use super::{Config, FilterSpec, LogLevel, OVERRIDE_FILTER_NAME, SelectorKind, parse_timestamp};
use crate::error::Result;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments
///
/// Flags win over environment variables, which win over the settings file.
#[derive(Clone, Debug, Parser)]
#[command(
    name = "immich-hass",
    version,
    about = "Rotate Immich photos into a Home Assistant media folder"
)]
pub struct Args {
    /// Path to the YAML settings file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "settings.yaml")]
    pub config: PathBuf,

    /// Override the logging level (DEBUG, INFO, WARNING, ERROR, CRITICAL)
    #[arg(long, env = "LOG_LEVEL", value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    /// Override the Immich server URL
    #[arg(long, env = "IMMICH_URL")]
    pub immich_url: Option<String>,

    /// Override the Immich API key
    #[arg(long, env = "IMMICH_API_KEY", hide_env_values = true)]
    pub immich_api_key: Option<String>,

    /// Override the publish directory
    #[arg(long, env = "HASS_IMG_PATH")]
    pub hass_img_path: Option<PathBuf>,

    /// Override the number of photos fetched per cycle
    #[arg(long, env = "NUM_PHOTOS", value_parser = parse_positive::<usize>)]
    pub num_photos: Option<usize>,

    /// Override the number of minutes between cycles
    #[arg(long, env = "UPDATE_INTERVAL_MINUTES", value_parser = parse_positive::<u64>)]
    pub update_interval_minutes: Option<u64>,

    /// Override the selector type (random, smart, or smart-rng)
    #[arg(long, env = "SELECTOR_TYPE", value_parser = parse_selector_kind)]
    pub selector_type: Option<SelectorKind>,

    /// Override the search query (required when selector-type is smart or smart-rng)
    #[arg(long, env = "SEARCH_QUERY")]
    pub search_query: Option<String>,

    /// Override the smart-rng candidate pool size (1-1000)
    #[arg(long, env = "MAX_SEARCH_RESULTS")]
    pub max_search_results: Option<u32>,

    /// Only photos taken in this city
    #[arg(long, env = "CITY_FILTER")]
    pub city: Option<String>,

    /// Only photos showing these people (comma-separated display names)
    #[arg(long, env = "PEOPLE_FILTER", value_delimiter = ',')]
    pub people: Vec<String>,

    /// Only photos taken after this date (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long, env = "TAKEN_AFTER", value_parser = parse_timestamp)]
    pub taken_after: Option<DateTime<Utc>>,

    /// Only photos taken before this date (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS)
    #[arg(long, env = "TAKEN_BEFORE", value_parser = parse_timestamp)]
    pub taken_before: Option<DateTime<Utc>>,

    /// Write the effective configuration to this YAML file and exit
    #[arg(long)]
    pub write_config: Option<PathBuf>,

    /// Run a single refresh cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl Args {
    /// Whether any per-filter flag was given
    pub fn has_filter_override(&self) -> bool {
        self.selector_type.is_some()
            || self.search_query.is_some()
            || self.max_search_results.is_some()
            || self.city.is_some()
            || !self.people().is_empty()
            || self.taken_after.is_some()
            || self.taken_before.is_some()
    }

    /// Filter set assembled from the per-filter flags
    pub fn filter_override(&self) -> FilterSpec {
        FilterSpec {
            name: OVERRIDE_FILTER_NAME.to_string(),
            selector_kind: self.selector_type.unwrap_or_default(),
            search_query: self.search_query.clone(),
            max_search_results: self.max_search_results,
            city: self.city.clone(),
            people: self.people(),
            taken_after: self.taken_after,
            taken_before: self.taken_before,
        }
    }

    /// Overlay the flags that were given onto `config`
    ///
    /// Per-filter flags replace the configured filter sets with a single
    /// `command-line` set.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if let Some(url) = &self.immich_url {
            config.immich.url = url.clone();
        }
        if let Some(key) = &self.immich_api_key {
            config.immich.api_key = key.clone();
        }
        if let Some(dir) = &self.hass_img_path {
            config.publish_dir = dir.clone();
        }
        if let Some(n) = self.num_photos {
            config.num_photos = n;
        }
        if let Some(minutes) = self.update_interval_minutes {
            config.update_interval_minutes = minutes;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if self.has_filter_override() {
            config.filters = vec![self.filter_override()];
        }
        Ok(())
    }

    fn people(&self) -> Vec<String> {
        self.people
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn parse_log_level(value: &str) -> std::result::Result<LogLevel, String> {
    value.parse()
}

fn parse_selector_kind(value: &str) -> std::result::Result<SelectorKind, String> {
    value.parse()
}

fn parse_positive<T>(value: &str) -> std::result::Result<T, String>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(format!("must be a valid positive integer, got {value:?}")),
    }
}
