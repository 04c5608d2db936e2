//! HTTP surface for the query service.
//!
//! - `GET /` – Static search page.
//! - `POST /search` – Body `{ "query": string, "semantic": bool, "vector": bool }`; returns
//!   `{ "results": [...] }` or `{ "error": string }` with a failure status.
//! - `GET /health` – Liveness probe reporting whether development mode is active.

use crate::query::{QueryError, QueryService, SearchRequest};
use crate::search::SearchHit;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

const INDEX_PAGE: &str = include_str!("../static/index.html");

/// Build the HTTP router exposing the search surface.
pub fn create_router(service: Arc<QueryService>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/search", post(search))
        .route("/health", get(health))
        .with_state(service)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Success response for `POST /search`.
#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// Dispatch a search request.
///
/// The body is parsed leniently: absent or mistyped fields fall back to `""`/`false`, and an
/// empty body counts as `{}`. Only bodies that are not JSON at all are rejected.
async fn search(
    State(service): State<Arc<QueryService>>,
    body: Bytes,
) -> Result<Json<SearchResponse>, AppError> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body).map_err(|err| AppError::BadRequest(err.to_string()))?
    };
    let request = SearchRequest::from_json(&value);
    let mode = request.mode();

    let results = service.search(&request).await?;
    tracing::info!(?mode, results = results.len(), "Search request completed");
    Ok(Json(SearchResponse { results }))
}

async fn health(State(service): State<Arc<QueryService>>) -> Json<Value> {
    Json(json!({ "status": "ok", "dev_mode": service.is_dev_mode() }))
}

enum AppError {
    BadRequest(String),
    Query(QueryError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Query(error) => {
                tracing::error!(error = %error, "Search request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        Self::Query(inner)
    }
}
