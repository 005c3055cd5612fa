//! Integration tests for the HTTP control surface

mod helpers;

use axum::body::Body;
use axum::http::StatusCode;
use helpers::{holiday, scheduler_in};
use http::{Method, Request};
use lss_scheduler::api::{create_router, AppContext};
use lss_scheduler::Scheduler;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn setup_test_router(dir: &TempDir) -> (axum::Router, Arc<Scheduler>) {
    let (scheduler, _) = scheduler_in(dir.path());
    scheduler.add_playlist(holiday()).unwrap();
    (create_router(AppContext::new(Arc::clone(&scheduler))), scheduler)
}

async fn send(app: &axum::Router, method: Method, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn get_json(app: &axum::Router, uri: &str) -> Value {
    let (status, body) = send(app, Method::GET, uri, "").await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_test_router(&dir);

    let body = get_json(&app, "/health").await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "lss-scheduler");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_command_endpoint() {
    let dir = TempDir::new().unwrap();
    let (app, scheduler) = setup_test_router(&dir);

    let body = get_json(&app, "/xScheduleCommand?Command=Play%20specified%20playlist&Parameters=Holiday").await;
    assert_eq!(body["result"], "ok");
    assert_eq!(body["rate"], 25);
    assert_eq!(scheduler.resolve_active().unwrap().name, "Holiday");

    let body = get_json(&app, "/xScheduleCommand?Command=Play%20specified%20playlist&Parameters=Xmas").await;
    assert_eq!(body["result"], "failed");
    assert_eq!(body["message"], "Playlist 'Xmas' not found.");

    let body = get_json(&app, "/xScheduleCommand?Command=Stop%20all%20now").await;
    assert_eq!(body["result"], "ok");
    assert!(body.get("rate").is_none());
}

#[tokio::test]
async fn test_query_endpoint() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_test_router(&dir);

    let body = get_json(&app, "/xScheduleQuery?Query=GetPlayLists").await;
    assert_eq!(body["playlists"][0]["name"], "Holiday");
    assert_eq!(body["playlists"][0]["length"], "0:04.500");

    let body = get_json(&app, "/xScheduleQuery?Query=GetPlayListSteps&Parameters=Xmas").await;
    assert_eq!(body["result"], "failed");
    assert_eq!(body["message"], "Playlist 'Xmas' not found.");
    assert_eq!(body["steps"], Value::Array(vec![]));

    let body = get_json(&app, "/xScheduleQuery?Query=Nope").await;
    assert_eq!(body["message"], "Unknown query.");
}

#[tokio::test]
async fn test_stash_store_and_retrieve() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_test_router(&dir);

    let (status, body) = send(
        &app,
        Method::POST,
        "/xScheduleStash?Command=Store&Key=layout",
        "{\"zoom\":2}",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["result"], "ok");

    let (status, body) = send(&app, Method::GET, "/xScheduleStash?Command=Retrieve&Key=layout", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"{\"zoom\":2}");

    let body = get_json(&app, "/xScheduleStash?Command=Retrieve&Key=missing").await;
    assert_eq!(body["message"], "Key 'missing' not found.");

    let body = get_json(&app, "/xScheduleStash?Command=Retrieve&Key=..%2Fetc").await;
    assert_eq!(body["message"], "Invalid key '../etc'.");
}

#[tokio::test]
async fn test_missing_command_parameter_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let (app, _) = setup_test_router(&dir);

    let (status, _) = send(&app, Method::GET, "/xScheduleCommand", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
