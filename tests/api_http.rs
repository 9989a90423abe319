// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use chrono::{Duration, Utc};
use content_search::api::{create_router, AppState};
use content_search::content::{Content, Metrics};
use content_search::ingest::ProviderManager;
use content_search::scoring;
use content_search::search::SearchService;
use content_search::store::{ContentStore, MemoryStore};
use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

const BODY_LIMIT: usize = 1024 * 1024;

fn seed() -> Vec<Content> {
    let now = Utc::now();
    let mut items = vec![
        Content::new(
            "v1",
            Metrics::Video {
                views: 5000,
                likes: 300,
                duration: 600,
            },
            now - Duration::days(2),
        )
        .with_provider("json_provider")
        .with_title("Rust in Production"),
        Content::new(
            "a1",
            Metrics::Text {
                reading_time: 6,
                reactions: 60,
            },
            now - Duration::days(20),
        )
        .with_provider("xml_provider")
        .with_title("Ownership Explained"),
    ];
    scoring::calculate_scores(&mut items, now);
    items
}

/// Router over a seeded in-memory store and no live providers.
async fn test_router() -> Router {
    let store = Arc::new(MemoryStore::new());
    store.bulk_upsert(seed()).await.unwrap();
    let service = Arc::new(SearchService::new(
        store,
        Arc::new(ProviderManager::new(vec![])),
    ));
    create_router(AppState { service })
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Json) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

#[tokio::test]
async fn health_returns_ok() {
    let (status, v) = call(test_router().await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "ok");
}

#[tokio::test]
async fn search_returns_envelope_with_page() {
    let (status, v) = call(test_router().await, get("/api/search?q=rust&page=x&limit=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);
    assert_eq!(v["data"]["total"], 1);
    assert_eq!(v["data"]["limit"], 10);
    assert_eq!(v["data"]["contents"][0]["provider_id"], "v1");
    assert_eq!(v["data"]["contents"][0]["type"], "video");
}

#[tokio::test]
async fn search_rejects_bad_type_and_long_query() {
    let (status, v) = call(test_router().await, get("/api/search?type=podcast")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().unwrap().contains("'video', 'text', or 'all'"));

    let long = "a".repeat(501);
    let (status, _) = call(test_router().await, get(&format!("/api/search?q={long}"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_with_filters_post() {
    let body = json!({ "query": "", "filters": { "type": "text", "language": "en" } });
    let (status, v) = call(test_router().await, post_json("/api/search/filters", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["total"], 1);
    assert_eq!(v["data"]["contents"][0]["type"], "text");

    // a non-string type is ignored, an unknown string is rejected
    let odd = json!({ "filters": { "type": 7 } });
    let (status, v) = call(test_router().await, post_json("/api/search/filters", &odd)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["total"], 2);

    let bad = json!({ "filters": { "type": "podcast" } });
    let (status, _) = call(test_router().await, post_json("/api/search/filters", &bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .method("POST")
        .uri("/api/search/filters")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, v) = call(test_router().await, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "Invalid request body");
}

#[tokio::test]
async fn content_detail_and_errors() {
    let (status, v) = call(test_router().await, get("/api/content/1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["content"]["id"], 1);
    assert!(v["data"]["score_breakdown"]["final_score"].as_f64().unwrap() > 0.0);

    let (status, v) = call(test_router().await, get("/api/content/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(v["error"], "Content not found");

    let (status, _) = call(test_router().await, get("/api/content/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn popular_is_ranked() {
    let (status, v) = call(test_router().await, get("/api/content/popular?limit=1")).await;
    assert_eq!(status, StatusCode::OK);
    let items = v["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    // engagement 60/6*5 puts the article ahead of the video
    assert_eq!(items[0]["provider_id"], "a1");
}

#[tokio::test]
async fn providers_refresh_and_stats() {
    let (status, v) = call(test_router().await, get("/api/providers")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"], json!([]));

    let (status, v) = call(test_router().await, post_json("/api/providers/refresh", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["fetched"], 0);

    let (status, v) = call(test_router().await, get("/api/providers/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["data"]["total_content"], 2);
    assert_eq!(v["data"]["video_count"], 1);
    assert_eq!(v["data"]["text_count"], 1);
}
