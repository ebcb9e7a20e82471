//! Asset selection strategies
//!
//! A filter set turns into one [`AssetSelector`], built fresh for every cycle.
//! Each strategy makes exactly one search call against the photo server.

use crate::config::{FilterSpec, SelectorKind};
use crate::error::{Error, Result};
use crate::immich::{PhotoServer, SearchCriteria, SearchFilters};
use crate::types::AssetId;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::{debug, info};

/// Strategy producing the asset ids for one cycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSelector {
    /// Server-side random selection
    Random {
        /// Filters passed to the server
        filters: SearchFilters,
    },
    /// Top hits of a free-text search
    Smart {
        /// Free-text query
        query: String,
        /// Filters passed to the server
        filters: SearchFilters,
    },
    /// Uniform sample from a larger pool of search hits
    SmartRng {
        /// Free-text query
        query: String,
        /// Number of hits requested to form the pool
        pool_size: u32,
        /// Filters passed to the server
        filters: SearchFilters,
    },
}

impl AssetSelector {
    /// Build the strategy for a filter set
    ///
    /// `person_ids` are the already-resolved server ids for the set's people.
    ///
    /// # Errors
    /// A smart kind without a query is a configuration error.
    pub fn build(spec: &FilterSpec, person_ids: Vec<String>) -> Result<Self> {
        let filters = SearchFilters {
            city: spec.city.clone(),
            person_ids,
            taken_after: spec.taken_after,
            taken_before: spec.taken_before,
        };

        let query = || {
            spec.search_query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    Error::config(
                        format!("filters.{}.search_query", spec.name),
                        format!(
                            "search_query is required for the {} selector",
                            spec.selector_kind
                        ),
                    )
                })
        };

        let selector = match spec.selector_kind {
            SelectorKind::Random => AssetSelector::Random { filters },
            SelectorKind::Smart => AssetSelector::Smart {
                query: query()?,
                filters,
            },
            SelectorKind::SmartRng => AssetSelector::SmartRng {
                query: query()?,
                pool_size: spec.effective_max_search_results(),
                filters,
            },
        };
        Ok(selector)
    }

    /// Which kind of strategy this is
    pub fn kind(&self) -> SelectorKind {
        match self {
            AssetSelector::Random { .. } => SelectorKind::Random,
            AssetSelector::Smart { .. } => SelectorKind::Smart,
            AssetSelector::SmartRng { .. } => SelectorKind::SmartRng,
        }
    }

    /// Ask the server for up to `desired_count` asset ids
    ///
    /// Fewer ids than requested (including none) is a valid result.
    pub async fn select_assets(
        &self,
        server: &dyn PhotoServer,
        desired_count: usize,
    ) -> Result<Vec<AssetId>> {
        match self {
            AssetSelector::Random { filters } => {
                let criteria = SearchCriteria::new(desired_count, filters.clone());
                let ids = server.search_random(&criteria).await?;
                info!(count = ids.len(), "random search returned assets");
                Ok(ids)
            }
            AssetSelector::Smart { query, filters } => {
                let criteria = SearchCriteria::new(desired_count, filters.clone());
                let hits = server.search_smart(query, &criteria).await?;
                let mut ids = dedup_preserving_order(hits);
                ids.truncate(desired_count);
                info!(query = %query, count = ids.len(), "smart search returned assets");
                Ok(ids)
            }
            AssetSelector::SmartRng {
                query,
                pool_size,
                filters,
            } => {
                let criteria = SearchCriteria::new(*pool_size as usize, filters.clone());
                let hits = server.search_smart(query, &criteria).await?;
                let pool = dedup_preserving_order(hits);
                let pool_len = pool.len();
                let ids = sample_distinct(pool, desired_count, &mut rand::thread_rng());
                info!(
                    query = %query,
                    pool = pool_len,
                    count = ids.len(),
                    "sampled assets from smart search pool"
                );
                Ok(ids)
            }
        }
    }
}

/// Drop repeated ids, keeping the first occurrence of each
pub fn dedup_preserving_order(ids: Vec<AssetId>) -> Vec<AssetId> {
    let before = ids.len();
    let mut seen = HashSet::with_capacity(before);
    let unique: Vec<AssetId> = ids.into_iter().filter(|id| seen.insert(id.clone())).collect();
    if unique.len() < before {
        debug!(
            duplicates = before - unique.len(),
            "removed duplicate asset ids"
        );
    }
    unique
}

/// Uniformly sample `count` distinct items from `pool`
///
/// Returns the whole pool unchanged when it holds `count` items or fewer.
pub fn sample_distinct<T: Clone, R: Rng + ?Sized>(
    mut pool: Vec<T>,
    count: usize,
    rng: &mut R,
) -> Vec<T> {
    if pool.len() <= count {
        return pool;
    }
    let (chosen, _) = pool.partial_shuffle(rng, count);
    chosen.to_vec()
}

#[cfg(test)]
mod tests;
