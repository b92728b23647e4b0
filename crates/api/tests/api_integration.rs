//! API integration tests.
//!
//! Drive the router end to end against a mocked registry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use fedidex_api::{middleware::AppState, router as api_router};
use fedidex_core::{DirectoryService, NetworkStatsService};
use fedidex_db::entities::{instance, ping, probe};
use fedidex_db::repositories::{InstanceRepository, PingRepository};
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_instance(id: &str, name: &str) -> instance::Model {
    instance::Model {
        id: id.to_string(),
        name: name.to_string(),
        title: None,
        short_description: None,
        description: None,
        uptime: 0.999,
        uptime_all: 0.95,
        up: true,
        ipv6: true,
        users: Some(100),
        statuses: Some("5000".to_string()),
        connections: Some(20),
        open_registrations: true,
        dead: false,
        blacklisted: false,
        version: Some("4.2.0".to_string()),
        https_score: Some(90),
        https_rank: Some("A".to_string()),
        obs_score: Some(80),
        obs_rank: Some("B+".to_string()),
        latest_obs_check: None,
        first_uptime: Some(Utc::now().into()),
        infos: Some(serde_json::json!({
            "languages": ["en"],
            "prohibitedContent": ["spam"],
            "shortDescription": "a test instance"
        })),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_ping(id: &str, instance_id: &str) -> ping::Model {
    ping::Model {
        id: id.to_string(),
        instance_id: instance_id.to_string(),
        up: true,
        latency_ms: Some(120),
        created_at: Utc::now().into(),
    }
}

fn create_test_probe(id: &str, ping_id: &str, kind: &str) -> probe::Model {
    probe::Model {
        id: id.to_string(),
        ping_id: ping_id.to_string(),
        kind: kind.to_string(),
        success: true,
        detail: None,
        latency_ms: Some(80),
        created_at: Utc::now().into(),
    }
}

/// Build the router over the given mock connection.
fn create_test_router(db: DatabaseConnection) -> Router {
    let db = Arc::new(db);
    let instance_repo = InstanceRepository::new(Arc::clone(&db));
    let ping_repo = PingRepository::new(Arc::clone(&db));

    let state = AppState {
        directory_service: DirectoryService::new(instance_repo.clone(), ping_repo),
        network_stats_service: NetworkStatsService::new(instance_repo),
    };

    api_router().with_state(state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_list_returns_instances_and_vocabularies() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_instance("i1", "social.example")]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["instances"].as_array().unwrap().len(), 1);
    assert_eq!(body["instances"][0]["name"], "social.example");
    assert_eq!(body["instances"][0]["uptime_str"], "99.900");
    assert!(!body["languages"].as_array().unwrap().is_empty());
    assert!(!body["prohibitedContent"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_strict_filters_on_prohibited_content() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_instance("i1", "social.example")]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list.json?strict=true&prohibited=spam")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["instances"].as_array().unwrap().len(), 1);
    assert!(body["instances"][0]["score"].is_null());
}

#[tokio::test]
async fn test_list_rejects_invalid_search_pattern() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list.json?search=(unclosed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_legacy_list_reports_totals() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_instance("i1", "social.example")]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list/old.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalUsers"], 100);
    assert_eq!(body["totalUp"], 1);
    assert_eq!(body["instances"][0]["uptime_str"], "95.000");
}

#[tokio::test]
async fn test_export_feed_keeps_null_fields() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_instance("i1", "social.example")]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/instances.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let first = &body.as_array().unwrap()[0];
    assert_eq!(first["name"], "social.example");
    assert!(first["title"].is_null());
    // The export reports the lifetime uptime fraction.
    assert_eq!(first["uptime"], 0.95);
    assert_eq!(first["openRegistrations"], true);
}

#[tokio::test]
async fn test_network_stats_snapshot_starts_zeroed() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/network.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["users"], 0);
    assert_eq!(body["instances"], 0);
    assert!(body["computedAt"].is_string());
}

#[tokio::test]
async fn test_ping_history_for_known_instance() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![create_test_instance("i1", "social.example")]])
        .append_query_results([vec![create_test_ping("p1", "i1")]])
        .append_query_results([vec![
            create_test_probe("pr1", "p1", "https"),
            create_test_probe("pr2", "p1", "ipv6"),
        ]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/social.example/ping.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["instance"], "social.example");
    assert_eq!(body["pings"].as_array().unwrap().len(), 1);
    assert_eq!(body["pings"][0]["probes"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ping_history_unknown_instance_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<instance::Model>::new()])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/ghost.example/ping.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INSTANCE_NOT_FOUND");
}

#[tokio::test]
async fn test_loose_list_orders_by_score() {
    let mut matching = create_test_instance("i1", "en.example");
    matching.infos = Some(serde_json::json!({
        "languages": ["en"],
        "prohibitedContent": []
    }));
    let mut other = create_test_instance("i2", "ja.example");
    other.infos = Some(serde_json::json!({
        "languages": ["ja", "en"],
        "prohibitedContent": []
    }));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![matching, other]])
        .into_connection();
    let app = create_test_router(db);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/list.json?languages=en,ja")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let instances = body["instances"].as_array().unwrap();
    assert_eq!(instances.len(), 2);
    // Full overlap outranks partial overlap.
    assert_eq!(instances[0]["name"], "ja.example");
    assert_eq!(instances[0]["score_str"], "10.0");
    assert_eq!(instances[1]["score_str"], "5.0");
}
