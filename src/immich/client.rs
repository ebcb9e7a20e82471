//! HTTP client for the Immich API

use super::types::{
    AssetRef, DownloadArchiveRequest, PeopleResponse, RandomSearchRequest, SmartSearchRequest,
    SmartSearchResponse,
};
use super::{PhotoServer, RemoteResult, SearchCriteria};
use crate::config::ImmichSettings;
use crate::error::{Error, RemoteError, Result};
use crate::types::AssetId;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Per-request timeout; archive downloads of large batches can be slow
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Connection establishment timeout
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-api-key";

/// Longest response body kept in a [`RemoteError::Status`]
const MAX_ERROR_BODY_CHARS: usize = 512;

const PEOPLE_ENDPOINT: &str = "/api/people";
const RANDOM_SEARCH_ENDPOINT: &str = "/api/search/random";
const SMART_SEARCH_ENDPOINT: &str = "/api/search/smart";
const DOWNLOAD_ARCHIVE_ENDPOINT: &str = "/api/download/archive";

/// Immich server client
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct ImmichClient {
    http: reqwest::Client,
    base_url: String,
}

impl ImmichClient {
    /// Build a client for the given server
    ///
    /// # Errors
    /// Returns a configuration error if the URL is empty or the API key cannot be
    /// sent as a header value.
    pub fn new(settings: &ImmichSettings) -> Result<Self> {
        let base_url = settings.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::config("immich.url", "server URL is empty"));
        }

        let mut api_key = HeaderValue::from_str(&settings.api_key).map_err(|_| {
            Error::config("immich.api_key", "API key contains invalid header characters")
        })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("immich-hass/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    /// Server base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn get(&self, endpoint: &str) -> RemoteResult<reqwest::Response> {
        let request = self.http.get(self.url(endpoint));
        send(endpoint, request).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> RemoteResult<reqwest::Response> {
        let request = self.http.post(self.url(endpoint)).json(body);
        send(endpoint, request).await
    }
}

/// Send the request and turn transport failures and non-2xx answers into errors
async fn send(endpoint: &str, request: reqwest::RequestBuilder) -> RemoteResult<reqwest::Response> {
    let response = request.send().await.map_err(|source| RemoteError::Transport {
        endpoint: endpoint.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        // Body is best-effort context only
        let body = response.text().await.unwrap_or_default();
        return Err(RemoteError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    Ok(response)
}

async fn read_bytes(endpoint: &str, response: reqwest::Response) -> RemoteResult<Vec<u8>> {
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|source| RemoteError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })
}

async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> RemoteResult<T> {
    let body = read_bytes(endpoint, response).await?;
    serde_json::from_slice(&body).map_err(|e| RemoteError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl PhotoServer for ImmichClient {
    async fn list_people(&self) -> RemoteResult<HashMap<String, String>> {
        debug!(endpoint = PEOPLE_ENDPOINT, "fetching people");
        let response = self.get(PEOPLE_ENDPOINT).await?;
        let payload: PeopleResponse = read_json(PEOPLE_ENDPOINT, response).await?;

        let people: HashMap<String, String> = payload
            .people
            .into_iter()
            .filter(|p| !p.name.trim().is_empty())
            .map(|p| (p.name, p.id))
            .collect();

        info!(count = people.len(), "fetched named people from server");
        Ok(people)
    }

    async fn search_random(&self, criteria: &SearchCriteria) -> RemoteResult<Vec<AssetId>> {
        debug!(
            endpoint = RANDOM_SEARCH_ENDPOINT,
            size = criteria.size,
            filters = ?criteria.filters,
            "requesting random assets"
        );
        let body = RandomSearchRequest::new(criteria);
        let response = self.post(RANDOM_SEARCH_ENDPOINT, &body).await?;
        let assets: Vec<AssetRef> = read_json(RANDOM_SEARCH_ENDPOINT, response).await?;
        Ok(assets.into_iter().map(|a| a.id).collect())
    }

    async fn search_smart(
        &self,
        query: &str,
        criteria: &SearchCriteria,
    ) -> RemoteResult<Vec<AssetId>> {
        debug!(
            endpoint = SMART_SEARCH_ENDPOINT,
            query,
            size = criteria.size,
            filters = ?criteria.filters,
            "running smart search"
        );
        let body = SmartSearchRequest::new(query, criteria);
        let response = self.post(SMART_SEARCH_ENDPOINT, &body).await?;
        let payload: SmartSearchResponse = read_json(SMART_SEARCH_ENDPOINT, response).await?;
        Ok(payload.into_asset_ids())
    }

    async fn download_archive(&self, asset_ids: &[AssetId]) -> RemoteResult<Vec<u8>> {
        debug!(
            endpoint = DOWNLOAD_ARCHIVE_ENDPOINT,
            count = asset_ids.len(),
            "downloading archive"
        );
        let body = DownloadArchiveRequest { asset_ids };
        let response = self.post(DOWNLOAD_ARCHIVE_ENDPOINT, &body).await?;
        let bytes = read_bytes(DOWNLOAD_ARCHIVE_ENDPOINT, response).await?;
        debug!(bytes = bytes.len(), "archive downloaded");
        Ok(bytes)
    }
}
