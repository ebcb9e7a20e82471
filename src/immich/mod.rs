//! Photo server API surface
//!
//! The refresh pipeline only ever talks to the server through the four
//! operations of [`PhotoServer`]. [`ImmichClient`] implements them over HTTP;
//! tests substitute in-memory fakes.

mod client;
mod types;

pub use client::ImmichClient;
pub use types::{SearchCriteria, SearchFilters};

use crate::error::RemoteError;
use crate::types::AssetId;
use async_trait::async_trait;
use std::collections::HashMap;

/// Result type for photo server calls
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// The operations the refresh pipeline needs from the photo server
///
/// None of the operations retry; every failure is returned to the caller, which
/// decides whether to abandon the cycle.
#[async_trait]
pub trait PhotoServer: Send + Sync {
    /// Fetch every known person as display name → server id
    async fn list_people(&self) -> RemoteResult<HashMap<String, String>>;

    /// Server-side random selection of image assets matching `criteria`
    async fn search_random(&self, criteria: &SearchCriteria) -> RemoteResult<Vec<AssetId>>;

    /// Free-text search; direct asset hits first, then album member assets
    async fn search_smart(
        &self,
        query: &str,
        criteria: &SearchCriteria,
    ) -> RemoteResult<Vec<AssetId>>;

    /// Download the given assets as one zip archive
    async fn download_archive(&self, asset_ids: &[AssetId]) -> RemoteResult<Vec<u8>>;
}
