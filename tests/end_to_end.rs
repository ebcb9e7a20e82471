//! Full refresh cycles against a mock Immich server

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{StubConverter, config_for, file_names, zip_archive};
use immich_hass::{
    CycleOutcome, CycleStage, Event, FilterSpec, ImmichClient, PersonDirectory, PhotoUpdater,
    SelectorKind,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_people(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/people"))
        .and(header("x-api-key", "integration-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "people": [
                {"id": "p-alice", "name": "Alice"},
                {"id": "p-unnamed", "name": ""}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_archive(server: &MockServer, archive: Vec<u8>) {
    Mock::given(method("POST"))
        .and(path("/api/download/archive"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/octet-stream")
                .set_body_bytes(archive),
        )
        .mount(server)
        .await;
}

fn photo_archive() -> Vec<u8> {
    zip_archive(&[
        ("IMG_0001.jpg", b"first"),
        ("IMG_0002.JPG", b"second"),
        ("IMG_0003.HEIC", b"heic payload"),
    ])
}

async fn updater_for(
    server: &MockServer,
    dir: &TempDir,
    filters: Vec<FilterSpec>,
    converter: Arc<StubConverter>,
) -> PhotoUpdater {
    let config = config_for(&server.uri(), dir.path(), filters);
    config.validate().unwrap();
    let client = Arc::new(ImmichClient::new(&config.immich).unwrap());
    let people = PersonDirectory::fetch(client.as_ref()).await.unwrap();
    PhotoUpdater::new(config, client, converter, people)
}

#[tokio::test]
async fn random_cycle_publishes_converted_photos() {
    let server = MockServer::start().await;
    mount_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/search/random"))
        .and(body_partial_json(json!({"size": 3, "personIds": ["p-alice"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "a1"}, {"id": "a2"}, {"id": "a3"}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/download/archive"))
        .and(body_partial_json(json!({"assetIds": ["a1", "a2", "a3"]})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(photo_archive()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("stale.jpg"), b"old").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

    let mut spec = FilterSpec::random("family");
    spec.people = vec!["Alice".to_string(), "Nobody".to_string()];
    let converter = Arc::new(StubConverter::default());
    let mut updater = updater_for(&server, &dir, vec![spec], converter.clone()).await;
    let mut events = updater.subscribe();

    let report = match updater.run_cycle().await {
        CycleOutcome::Completed(report) => report,
        CycleOutcome::Failed { stage, error, .. } => panic!("failed at {stage}: {error}"),
    };

    assert_eq!(report.selected, 3);
    assert_eq!(report.extracted, 3);
    assert_eq!(report.published.len(), 3);
    assert_eq!(report.skipped, 0);
    assert_eq!(converter.converted().len(), 1);
    assert_eq!(
        file_names(dir.path()),
        vec!["IMG_0001.jpg", "IMG_0002.JPG", "IMG_0003.jpg", "notes.txt"]
    );
    assert!(updater.last_update().is_some());

    assert!(matches!(
        events.recv().await.unwrap(),
        Event::CycleStarted { ref filter, index: 0 } if filter == "family"
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        Event::CycleCompleted { published: 3, skipped: 0, .. }
    ));
}

#[tokio::test]
async fn smart_rng_cycle_samples_from_candidate_pool() {
    let server = MockServer::start().await;
    mount_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/search/smart"))
        .and(body_partial_json(json!({"query": "beach", "size": 10, "page": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "assets": {"items": [
                {"id": "s1"}, {"id": "s2"}, {"id": "s3"}, {"id": "s4"}, {"id": "s5"}
            ]},
            "albums": {"items": []}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_archive(&server, zip_archive(&[("beach.png", b"png")])).await;

    let dir = TempDir::new().unwrap();
    let mut spec = FilterSpec::smart("beach", SelectorKind::SmartRng, "beach");
    spec.max_search_results = Some(10);
    let converter = Arc::new(StubConverter::default());
    let mut updater = updater_for(&server, &dir, vec![spec], converter).await;

    let outcome = updater.run_cycle().await;
    let CycleOutcome::Completed(report) = outcome else {
        panic!("cycle should complete");
    };
    assert_eq!(report.selected, 3);
    assert_eq!(file_names(dir.path()), vec!["beach.png"]);

    let requests = server.received_requests().await.unwrap();
    let download = requests
        .iter()
        .find(|r| r.url.path() == "/api/download/archive")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&download.body).unwrap();
    let ids = body["assetIds"].as_array().unwrap();
    assert_eq!(ids.len(), 3);
    for id in ids {
        assert!(["s1", "s2", "s3", "s4", "s5"].contains(&id.as_str().unwrap()));
    }
}

#[tokio::test]
async fn heic_falls_back_to_video_when_still_conversion_fails() {
    let server = MockServer::start().await;
    mount_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/search/random"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "live"}])))
        .mount(&server)
        .await;
    mount_archive(&server, zip_archive(&[("LIVE.heic", b"sequence")])).await;

    let dir = TempDir::new().unwrap();
    let converter = Arc::new(StubConverter::without_image_support());
    let mut updater =
        updater_for(&server, &dir, vec![FilterSpec::random("live")], converter).await;

    assert!(updater.run_cycle().await.is_completed());
    assert_eq!(file_names(dir.path()), vec!["LIVE.mp4"]);
}

#[tokio::test]
async fn server_error_keeps_rotation_and_leaves_no_archive() {
    let server = MockServer::start().await;
    mount_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/search/random"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "x"}])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/download/archive"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let filters = vec![FilterSpec::random("first"), FilterSpec::random("second")];
    let mut updater =
        updater_for(&server, &dir, filters, Arc::new(StubConverter::default())).await;

    match updater.run_cycle().await {
        CycleOutcome::Failed { filter, stage, .. } => {
            assert_eq!(filter, "first");
            assert_eq!(stage, CycleStage::Downloading);
        }
        CycleOutcome::Completed(_) => panic!("download should fail"),
    }
    assert_eq!(updater.cursor(), 0);
    assert!(file_names(dir.path()).is_empty());
}

#[tokio::test]
async fn run_loop_refreshes_until_cancelled() {
    let server = MockServer::start().await;
    mount_people(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/search/random"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "a"}])))
        .mount(&server)
        .await;
    mount_archive(&server, zip_archive(&[("a.jpg", b"a")])).await;

    let dir = TempDir::new().unwrap();
    let filters = vec![FilterSpec::random("one"), FilterSpec::random("two")];
    let updater = updater_for(&server, &dir, filters, Arc::new(StubConverter::default()))
        .await
        .with_interval(Duration::from_millis(20));
    let mut events = updater.subscribe();

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(updater.run(shutdown.clone()));

    let mut completed = Vec::new();
    while completed.len() < 3 {
        let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
            .await
            .unwrap()
            .unwrap();
        if let Event::CycleCompleted { filter, .. } = event {
            completed.push(filter);
        }
    }
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(completed, vec!["one", "two", "one"]);
    assert_eq!(file_names(dir.path()), vec!["a.jpg"]);
}
