//! Request and response payloads for the Immich HTTP API

use crate::types::AssetId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asset type restriction sent with every search
pub(crate) const ASSET_TYPE_IMAGE: &str = "IMAGE";

/// Optional search filters shared by random and smart search
///
/// Unset fields are left out of the request body entirely: the server treats the
/// presence of a field as filter activation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Exact city match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    /// Assets showing all of these people
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub person_ids: Vec<String>,

    /// Taken at or after
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_after: Option<DateTime<Utc>>,

    /// Taken before
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taken_before: Option<DateTime<Utc>>,
}

/// What a search should return
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchCriteria {
    /// Number of results requested (server page size)
    pub size: usize,
    /// Optional filters
    pub filters: SearchFilters,
}

impl SearchCriteria {
    /// Criteria for `size` results with the given filters
    pub fn new(size: usize, filters: SearchFilters) -> Self {
        Self { size, filters }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RandomSearchRequest<'a> {
    pub size: usize,
    #[serde(rename = "type")]
    pub asset_type: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub with_people: bool,
    #[serde(flatten)]
    pub filters: &'a SearchFilters,
}

impl<'a> RandomSearchRequest<'a> {
    pub fn new(criteria: &'a SearchCriteria) -> Self {
        Self {
            size: criteria.size,
            asset_type: ASSET_TYPE_IMAGE,
            with_people: !criteria.filters.person_ids.is_empty(),
            filters: &criteria.filters,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SmartSearchRequest<'a> {
    pub query: &'a str,
    pub size: usize,
    pub page: u32,
    #[serde(rename = "type")]
    pub asset_type: &'static str,
    #[serde(flatten)]
    pub filters: &'a SearchFilters,
}

impl<'a> SmartSearchRequest<'a> {
    pub fn new(query: &'a str, criteria: &'a SearchCriteria) -> Self {
        Self {
            query,
            size: criteria.size,
            page: 1,
            asset_type: ASSET_TYPE_IMAGE,
            filters: &criteria.filters,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DownloadArchiveRequest<'a> {
    pub asset_ids: &'a [AssetId],
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssetRef {
    pub id: AssetId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PersonDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeopleResponse {
    #[serde(default)]
    pub people: Vec<PersonDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Section<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumDto {
    #[serde(default)]
    pub assets: Vec<AssetRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SmartSearchResponse {
    #[serde(default)]
    pub assets: Section<AssetRef>,
    #[serde(default)]
    pub albums: Section<AlbumDto>,
}

impl SmartSearchResponse {
    /// Direct hits in server order, then every album's member assets
    pub fn into_asset_ids(self) -> Vec<AssetId> {
        let mut ids: Vec<AssetId> = self.assets.items.into_iter().map(|a| a.id).collect();
        ids.extend(
            self.albums
                .items
                .into_iter()
                .flat_map(|album| album.assets.into_iter().map(|a| a.id)),
        );
        ids
    }
}
