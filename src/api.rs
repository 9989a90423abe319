//! HTTP surface: JSON routes over `SearchService` wrapped in the
//! `{"success": .., "data": ..}` envelope.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_axum::axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::content::KindFilter;
use crate::error::ContentError;
use crate::search::SearchService;

const MAX_QUERY_LEN: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search))
        .route("/api/search/filters", post(search_with_filters))
        .route("/api/content/popular", get(popular))
        .route("/api/content/{id}", get(content_detail))
        .route("/api/providers", get(providers))
        .route("/api/providers/refresh", post(refresh))
        .route("/api/providers/stats", get(stats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body `{"error": msg}` with a mapped status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// NotFound → 404 and Validation → 400 keep their message; anything else
    /// is logged and reported as `fallback` with a 500.
    fn from_content(e: ContentError, fallback: &str) -> Self {
        match e {
            ContentError::NotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: "Content not found".into(),
            },
            ContentError::Validation(msg) => Self::bad_request(msg),
            other => {
                tracing::error!(error = %other, "{fallback}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: fallback.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn ok<T: Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}

/// Unparseable numbers become 0, which the service clamps to its defaults.
fn parse_num(v: Option<&str>) -> i64 {
    v.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}

fn check_query_len(q: &str) -> Result<(), ApiError> {
    if q.len() > MAX_QUERY_LEN {
        return Err(ApiError::bad_request(format!(
            "Query too long. Maximum {MAX_QUERY_LEN} characters allowed."
        )));
    }
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
    }))
}

#[derive(Deserialize, Default)]
struct SearchParams {
    q: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    Query(p): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kind: KindFilter = p
        .kind
        .as_deref()
        .unwrap_or("")
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid content type. Must be 'video', 'text', or 'all'"))?;
    let query = p.q.unwrap_or_default();
    check_query_len(&query)?;

    let page = state
        .service
        .search(
            &query,
            kind,
            parse_num(p.page.as_deref()),
            parse_num(p.limit.as_deref()),
        )
        .await
        .map_err(|e| ApiError::from_content(e, "Failed to perform search"))?;
    Ok(ok(page))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct FiltersReq {
    query: String,
    filters: HashMap<String, serde_json::Value>,
    page: i64,
    limit: i64,
}

async fn search_with_filters(
    State(state): State<AppState>,
    body: Result<Json<FiltersReq>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::bad_request("Invalid request body"))?;
    check_query_len(&req.query)?;

    let page = state
        .service
        .search_with_filters(&req.query, &req.filters, req.page, req.limit)
        .await
        .map_err(|e| ApiError::from_content(e, "Failed to perform search"))?;
    Ok(ok(page))
}

#[derive(Deserialize, Default)]
struct LimitParams {
    limit: Option<String>,
}

async fn popular(
    State(state): State<AppState>,
    Query(p): Query<LimitParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let items = state
        .service
        .get_popular_content(parse_num(p.limit.as_deref()))
        .await
        .map_err(|e| ApiError::from_content(e, "Failed to get popular content"))?;
    Ok(ok(items))
}

async fn content_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid content ID"))?;
    let detail = state
        .service
        .get_content_detail(id)
        .await
        .map_err(|e| ApiError::from_content(e, "Failed to get content"))?;
    Ok(ok(detail))
}

async fn providers(State(state): State<AppState>) -> Json<serde_json::Value> {
    ok(state.service.get_providers())
}

async fn refresh(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let report = state
        .service
        .refresh_content(&CancellationToken::new())
        .await
        .map_err(|e| ApiError::from_content(e, "Failed to refresh content from providers"))?;
    Ok(Json(json!({
        "success": true,
        "message": "Content refreshed successfully",
        "data": report,
    })))
}

async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state
        .service
        .get_content_stats()
        .await
        .map_err(|e| ApiError::from_content(e, "Failed to get content statistics"))?;
    Ok(ok(stats))
}
