//! Integration Tests for API Endpoints
//!
//! Tests the full request/response cycle for each endpoint against an
//! in-memory backend and a scripted feed.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use parlayer::{
    api::create_router,
    cache::{FileBackend, KvBackend, MemoryBackend},
    error::{ParlayerError, Result},
    feed::ProjectionFeed,
    models::{ProjectionBatch, RawEnvelope},
    AppState, Config,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

// == Helper Functions ==

/// Feed that serves queued bodies in order, then fails.
struct ScriptedFeed {
    bodies: Mutex<Vec<Value>>,
}

impl ScriptedFeed {
    fn new(bodies: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            bodies: Mutex::new(bodies.into_iter().rev().collect()),
        })
    }
}

#[async_trait]
impl ProjectionFeed for ScriptedFeed {
    async fn fetch(&self) -> Result<ProjectionBatch> {
        match self.bodies.lock().await.pop() {
            Some(body) => Ok(RawEnvelope::from_json(body)?.into_batch()),
            None => Err(ParlayerError::Feed("upstream unavailable".to_string())),
        }
    }
}

fn test_config() -> Config {
    Config {
        min_fetch_interval: 0,
        ..Config::default()
    }
}

fn create_app(backend: Arc<dyn KvBackend>, feed: Arc<ScriptedFeed>) -> Router {
    create_router(AppState::from_config(&test_config(), backend, feed))
}

fn create_test_app() -> Router {
    create_app(Arc::new(MemoryBackend::new()), ScriptedFeed::new(Vec::new()))
}

fn board(lines: &[(&str, f64)], start_offset_hours: i64) -> Value {
    let start = (Utc::now() + Duration::hours(start_offset_hours)).to_rfc3339();
    let data: Vec<Value> = lines
        .iter()
        .map(|(id, line)| {
            json!({
                "type": "projection",
                "id": id,
                "attributes": {
                    "line_score": line,
                    "stat_type": "Points",
                    "start_time": start,
                    "status": "pre_game",
                    "description": "LAL vs BOS"
                },
                "relationships": {
                    "new_player": { "data": { "type": "new_player", "id": format!("player-{}", id) } }
                }
            })
        })
        .collect();

    json!({
        "data": data,
        "included": [{ "type": "new_player", "id": "player-A", "attributes": { "name": "Someone" } }]
    })
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

fn movement_of<'a>(json: &'a Value, id: &str) -> &'a Value {
    json["data"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .map(|p| &p["attributes"]["line_movement"])
        .unwrap()
}

// == Reconcile Endpoint Tests ==

#[tokio::test]
async fn test_first_reconcile_returns_batch_unchanged() {
    let app = create_test_app();
    let input = board(&[("A", 20.0), ("B", 5.5)], 1);

    let (status, json) = send(&app, "POST", "/projections/reconcile", Some(input.clone())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["cached"], false);
    assert_eq!(json["data"]["data"].as_array().unwrap().len(), 2);
    assert!(movement_of(&json, "A").is_null());
    assert_eq!(json["data"]["data"][0]["attributes"]["description"], "LAL vs BOS");
    assert_eq!(json["data"]["included"], input["included"]);
}

#[tokio::test]
async fn test_line_movement_reported_against_first_value() {
    let app = create_test_app();

    send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 20.0)], 1))).await;
    let (_, up) = send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 22.0)], 1))).await;
    let (_, down) =
        send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 19.0)], 1))).await;

    assert_eq!(
        movement_of(&up, "A"),
        &json!({ "original": 20.0, "current": 22.0, "direction": "up", "difference": 2.0 })
    );
    assert_eq!(
        movement_of(&down, "A"),
        &json!({ "original": 20.0, "current": 19.0, "direction": "down", "difference": -1.0 })
    );
}

#[tokio::test]
async fn test_unchanged_line_has_no_movement_field() {
    let app = create_test_app();

    send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 20.0)], 1))).await;
    let (_, json) = send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 20.0)], 1))).await;

    let attributes = &json["data"]["data"][0]["attributes"];
    assert!(attributes.get("line_movement").is_none());
}

#[tokio::test]
async fn test_new_projection_merged_alongside_existing() {
    let app = create_test_app();

    send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 20.0)], 1))).await;
    send(
        &app,
        "POST",
        "/projections/reconcile",
        Some(board(&[("A", 21.0), ("B", 7.5)], 1)),
    )
    .await;

    let (status, json) = send(&app, "GET", "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], true);
    assert_eq!(movement_of(&json, "A")["original"], 20.0);
    assert!(movement_of(&json, "B").is_null());
}

#[tokio::test]
async fn test_malformed_items_are_skipped() {
    let app = create_test_app();
    let mut input = board(&[("A", 20.0)], 1);
    input["data"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "id": "broken", "attributes": { "line_score": "twenty" } }));

    let (status, json) = send(&app, "POST", "/projections/reconcile", Some(input)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["data"].as_array().unwrap().len(), 1);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["skipped_items"], 1);
}

#[tokio::test]
async fn test_reconcile_rejects_non_array_data() {
    let app = create_test_app();

    let (status, json) =
        send(&app, "POST", "/projections/reconcile", Some(json!({ "data": "nope" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("data"));
}

#[tokio::test]
async fn test_reconcile_rejects_missing_data() {
    let app = create_test_app();

    let (status, json) =
        send(&app, "POST", "/projections/reconcile", Some(json!({ "included": [] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, _) = send(&app, "GET", "/cache", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Projections Endpoint Tests ==

#[tokio::test]
async fn test_projections_fetches_and_tracks_movement() {
    let feed = ScriptedFeed::new(vec![board(&[("A", 20.0)], 1), board(&[("A", 18.5)], 1)]);
    let app = create_app(Arc::new(MemoryBackend::new()), feed);

    let (status, first) = send(&app, "GET", "/projections", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);

    let (_, second) = send(&app, "GET", "/projections", None).await;
    assert_eq!(second["cached"], false);
    assert_eq!(movement_of(&second, "A")["direction"], "down");
    assert_eq!(movement_of(&second, "A")["difference"], -1.5);
}

#[tokio::test]
async fn test_projections_serves_snapshot_when_feed_down() {
    let feed = ScriptedFeed::new(vec![board(&[("A", 20.0)], 1)]);
    let app = create_app(Arc::new(MemoryBackend::new()), feed);

    send(&app, "GET", "/projections", None).await;
    let (status, json) = send(&app, "GET", "/projections", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], true);
    assert_eq!(json["data"]["data"][0]["id"], "A");
}

#[tokio::test]
async fn test_projections_feed_down_without_snapshot() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/projections", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["success"], false);
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_cache_not_found_when_empty() {
    let app = create_test_app();
    let (status, _) = send(&app, "GET", "/cache", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_resets_baselines() {
    let app = create_test_app();

    send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 20.0)], 1))).await;
    let (status, json) = send(&app, "DELETE", "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("PROPS_PROJECTION_CACHE"));

    let (_, after) = send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 25.0)], 1))).await;
    assert!(movement_of(&after, "A").is_null());
}

#[tokio::test]
async fn test_sweep_drops_finished_games() {
    let app = create_test_app();

    let mut input = board(&[("LIVE", 10.5)], 1);
    let finished = board(&[("DONE", 3.5)], -6);
    input["data"]
        .as_array_mut()
        .unwrap()
        .push(finished["data"][0].clone());
    send(&app, "POST", "/projections/reconcile", Some(input)).await;

    let (status, json) = send(&app, "POST", "/cache/sweep", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);
    assert_eq!(json["remaining"], 1);
    assert_eq!(json["cleared"], false);

    let (_, cache) = send(&app, "GET", "/cache", None).await;
    let ids: Vec<&str> = cache["data"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["LIVE"]);
}

#[tokio::test]
async fn test_sweep_clears_when_everything_finished() {
    let app = create_test_app();

    send(&app, "POST", "/projections/reconcile", Some(board(&[("DONE", 3.5)], -6))).await;
    let (_, json) = send(&app, "POST", "/cache/sweep", None).await;

    assert_eq!(json["cleared"], true);
    let (status, _) = send(&app, "GET", "/cache", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cache_never_serves_finished_games() {
    let app = create_test_app();

    let mut input = board(&[("LIVE", 10.5)], 1);
    let finished = board(&[("DONE", 3.5)], -5);
    input["data"]
        .as_array_mut()
        .unwrap()
        .push(finished["data"][0].clone());
    send(&app, "POST", "/projections/reconcile", Some(input)).await;

    let (status, json) = send(&app, "GET", "/cache", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["data"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["LIVE"]);
}

// == Persistence Tests ==

#[tokio::test]
async fn test_baselines_survive_restart_with_file_backend() {
    let dir = tempfile::tempdir().unwrap();

    let first = create_app(
        Arc::new(FileBackend::open(dir.path()).await.unwrap()),
        ScriptedFeed::new(Vec::new()),
    );
    send(&first, "POST", "/projections/reconcile", Some(board(&[("A", 20.0)], 1))).await;
    drop(first);

    let second = create_app(
        Arc::new(FileBackend::open(dir.path()).await.unwrap()),
        ScriptedFeed::new(Vec::new()),
    );
    let (_, json) =
        send(&second, "POST", "/projections/reconcile", Some(board(&[("A", 24.0)], 1))).await;

    assert_eq!(movement_of(&json, "A")["original"], 20.0);
    assert_eq!(movement_of(&json, "A")["difference"], 4.0);
}

// == Stats & Health Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();

    send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 20.0), ("B", 1.5)], 1))).await;
    send(&app, "POST", "/projections/reconcile", Some(board(&[("A", 21.0), ("B", 1.5)], 1))).await;

    let (status, json) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reconciliations"], 2);
    assert_eq!(json["new_projections"], 2);
    assert_eq!(json["movements_detected"], 1);
    assert_eq!(json["unchanged_projections"], 1);
    assert!((json["movement_rate"].as_f64().unwrap() - 0.5).abs() < 0.001);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}
