//! Core types for immich-hass

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Opaque identifier of an asset on the photo server
///
/// No structure is assumed; the value is only meaningful to the server.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    /// Create a new AssetId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AssetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Steps of a refresh cycle, in execution order
///
/// Used for logging and for reporting where a failed cycle stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    /// Reading the filter set at the rotation cursor and resolving people
    SelectingFilter,
    /// Building the selection strategy for the filter set
    BuildingStrategy,
    /// Evicting last cycle's media from the publish directory
    CleaningPublishDir,
    /// Asking the server for asset ids
    FetchingIds,
    /// Downloading the archive
    Downloading,
    /// Persisting the archive into the publish directory
    SavingArchive,
    /// Unpacking the archive
    Extracting,
    /// Converting HEIC-family files
    Converting,
    /// Removing converted originals and the archive
    Cleanup,
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CycleStage::SelectingFilter => "selecting_filter",
            CycleStage::BuildingStrategy => "building_strategy",
            CycleStage::CleaningPublishDir => "cleaning_publish_dir",
            CycleStage::FetchingIds => "fetching_ids",
            CycleStage::Downloading => "downloading",
            CycleStage::SavingArchive => "saving_archive",
            CycleStage::Extracting => "extracting",
            CycleStage::Converting => "converting",
            CycleStage::Cleanup => "cleanup",
        };
        f.write_str(s)
    }
}

/// Summary of a successful refresh cycle
#[derive(Clone, Debug)]
pub struct CycleReport {
    /// Name of the filter set that was used
    pub filter: String,
    /// Number of asset ids the strategy returned
    pub selected: usize,
    /// Number of regular files unpacked from the archive
    pub extracted: usize,
    /// Files now present in the publish directory from this cycle
    pub published: Vec<PathBuf>,
    /// Number of files that could not be processed and were skipped
    pub skipped: usize,
    /// When the cycle finished
    pub finished_at: DateTime<Local>,
}

/// Result of one pass of the refresh pipeline
///
/// Failed cycles are not errors from the loop's point of view: they are logged,
/// reported, and retried later.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Every stage completed and the rotation cursor advanced
    Completed(CycleReport),
    /// A stage failed; the rotation cursor was left unchanged
    Failed {
        /// Name of the filter set that was being processed
        filter: String,
        /// The stage that failed
        stage: CycleStage,
        /// The error that aborted the cycle
        error: crate::error::Error,
    },
}

impl CycleOutcome {
    /// Whether the cycle completed
    pub fn is_completed(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }
}

/// Events emitted by the refresh loop
///
/// Consumers subscribe via [`PhotoUpdater::subscribe`](crate::PhotoUpdater::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A cycle is starting
    CycleStarted {
        /// Filter set name
        filter: String,
        /// Rotation index of the filter set
        index: usize,
    },

    /// A cycle finished and published files
    CycleCompleted {
        /// Filter set name
        filter: String,
        /// Number of files published
        published: usize,
        /// Number of files skipped due to per-file errors
        skipped: usize,
    },

    /// A cycle failed and will be retried
    CycleFailed {
        /// Filter set name
        filter: String,
        /// Stage that failed
        stage: CycleStage,
        /// Error message
        error: String,
    },

    /// The refresh loop stopped
    Shutdown,
}
