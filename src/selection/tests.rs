// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;
use crate::test_helpers::FakeServer;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;

fn ids(raw: &[&str]) -> Vec<AssetId> {
    raw.iter().map(|s| AssetId::from(*s)).collect()
}

// -----------------------------------------------------------------------------
// build
// -----------------------------------------------------------------------------

#[test]
fn test_build_random_carries_filters() {
    let mut spec = FilterSpec::random("holidays");
    spec.city = Some("Nice".into());
    let selector = AssetSelector::build(&spec, vec!["p1".into()]).unwrap();

    assert_eq!(selector.kind(), SelectorKind::Random);
    match selector {
        AssetSelector::Random { filters } => {
            assert_eq!(filters.city.as_deref(), Some("Nice"));
            assert_eq!(filters.person_ids, vec!["p1".to_string()]);
        }
        other => panic!("expected random selector, got {other:?}"),
    }
}

#[test]
fn test_build_smart_rng_uses_default_pool_size() {
    let spec = FilterSpec::smart("beach", SelectorKind::SmartRng, "beach");
    match AssetSelector::build(&spec, Vec::new()).unwrap() {
        AssetSelector::SmartRng {
            query, pool_size, ..
        } => {
            assert_eq!(query, "beach");
            assert_eq!(pool_size, 250);
        }
        other => panic!("expected smart-rng selector, got {other:?}"),
    }
}

#[test]
fn test_build_smart_rng_honours_configured_pool_size() {
    let mut spec = FilterSpec::smart("beach", SelectorKind::SmartRng, "beach");
    spec.max_search_results = Some(40);
    match AssetSelector::build(&spec, Vec::new()).unwrap() {
        AssetSelector::SmartRng { pool_size, .. } => assert_eq!(pool_size, 40),
        other => panic!("expected smart-rng selector, got {other:?}"),
    }
}

#[test]
fn test_build_smart_without_query_is_config_error() {
    let mut spec = FilterSpec::smart("broken", SelectorKind::Smart, "x");
    spec.search_query = Some("   ".into());
    let err = AssetSelector::build(&spec, Vec::new()).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

// -----------------------------------------------------------------------------
// select_assets
// -----------------------------------------------------------------------------

#[tokio::test]
async fn test_random_requests_desired_count_without_query() {
    let server = FakeServer::new().with_random_ids(["a", "b", "c"]);
    let selector = AssetSelector::build(&FilterSpec::random("r"), Vec::new()).unwrap();

    let result = selector.select_assets(&server, 3).await.unwrap();
    assert_eq!(result, ids(&["a", "b", "c"]));

    let calls = server.calls();
    assert_eq!(calls.random.len(), 1);
    assert_eq!(calls.random[0].size, 3);
    assert!(calls.smart.is_empty(), "random selector must not run a text search");
}

#[tokio::test]
async fn test_random_short_result_is_not_an_error() {
    let server = FakeServer::new().with_random_ids(["only"]);
    let selector = AssetSelector::build(&FilterSpec::random("r"), Vec::new()).unwrap();
    assert_eq!(
        selector.select_assets(&server, 10).await.unwrap(),
        ids(&["only"])
    );
}

#[tokio::test]
async fn test_smart_sends_query_and_dedups() {
    let server = FakeServer::new().with_smart_ids(["a", "b", "a", "c", "b", "d"]);
    let spec = FilterSpec::smart("s", SelectorKind::Smart, "mountains");
    let selector = AssetSelector::build(&spec, Vec::new()).unwrap();

    let result = selector.select_assets(&server, 3).await.unwrap();
    assert_eq!(result, ids(&["a", "b", "c"]));

    let calls = server.calls();
    assert_eq!(calls.smart.len(), 1);
    assert_eq!(calls.smart[0].0, "mountains");
    assert_eq!(calls.smart[0].1.size, 3);
    assert!(calls.random.is_empty());
}

#[tokio::test]
async fn test_smart_rng_requests_pool_and_samples_distinct() {
    let pool: Vec<String> = (0..50).map(|i| format!("asset-{i}")).collect();
    let server = FakeServer::new().with_smart_ids(pool.iter().map(String::as_str));
    let mut spec = FilterSpec::smart("s", SelectorKind::SmartRng, "cats");
    spec.max_search_results = Some(50);
    let selector = AssetSelector::build(&spec, Vec::new()).unwrap();

    let result = selector.select_assets(&server, 5).await.unwrap();
    assert_eq!(result.len(), 5);
    let unique: HashSet<_> = result.iter().collect();
    assert_eq!(unique.len(), 5, "sample must not repeat ids");
    assert!(result.iter().all(|id| pool.contains(&id.0)));

    let calls = server.calls();
    assert_eq!(calls.smart[0].0, "cats");
    assert_eq!(calls.smart[0].1.size, 50);
}

#[tokio::test]
async fn test_smart_rng_small_pool_passes_through_deduped() {
    let server = FakeServer::new().with_smart_ids(["x", "y", "x"]);
    let spec = FilterSpec::smart("s", SelectorKind::SmartRng, "dogs");
    let selector = AssetSelector::build(&spec, Vec::new()).unwrap();

    let result = selector.select_assets(&server, 5).await.unwrap();
    assert_eq!(result, ids(&["x", "y"]));
}

#[tokio::test]
async fn test_search_failure_propagates() {
    let server = FakeServer::new().with_random_ids(["a"]);
    server.fail_searches(true);
    let selector = AssetSelector::build(&FilterSpec::random("r"), Vec::new()).unwrap();
    let err = selector.select_assets(&server, 1).await.unwrap_err();
    assert!(matches!(err, Error::Remote(_)));
}

// -----------------------------------------------------------------------------
// helpers
// -----------------------------------------------------------------------------

#[test]
fn test_dedup_preserves_first_seen_order() {
    let result = dedup_preserving_order(ids(&["c", "a", "c", "b", "a"]));
    assert_eq!(result, ids(&["c", "a", "b"]));
}

#[test]
fn test_sample_distinct_returns_pool_when_small() {
    let mut rng = StdRng::seed_from_u64(7);
    assert_eq!(sample_distinct(vec![1, 2, 3], 3, &mut rng), vec![1, 2, 3]);
    assert_eq!(sample_distinct(vec![1, 2], 5, &mut rng), vec![1, 2]);
    assert!(sample_distinct(Vec::<u8>::new(), 2, &mut rng).is_empty());
}

#[test]
fn test_sample_distinct_exact_count_and_distinct() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..100 {
        let sample = sample_distinct((0..20).collect::<Vec<u32>>(), 7, &mut rng);
        assert_eq!(sample.len(), 7);
        let unique: HashSet<_> = sample.iter().collect();
        assert_eq!(unique.len(), 7);
        assert!(sample.iter().all(|n| *n < 20));
    }
}

#[test]
fn test_sample_distinct_is_uniform() {
    const POOL: u32 = 10;
    const PICK: usize = 3;
    const TRIALS: usize = 30_000;

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut counts: HashMap<u32, usize> = HashMap::new();
    for _ in 0..TRIALS {
        for n in sample_distinct((0..POOL).collect::<Vec<_>>(), PICK, &mut rng) {
            *counts.entry(n).or_default() += 1;
        }
    }

    // Each element is expected TRIALS * PICK / POOL = 9000 times
    let expected = TRIALS * PICK / POOL as usize;
    let tolerance = expected / 10;
    for n in 0..POOL {
        let seen = counts.get(&n).copied().unwrap_or(0);
        assert!(
            seen.abs_diff(expected) < tolerance,
            "element {n} chosen {seen} times, expected about {expected}"
        );
    }
}
