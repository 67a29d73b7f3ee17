use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use crawlmark_core::{CrawlResult, Crawler, MetadataEntry, fetch_url, flatten};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::ApiError;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    crawler: Crawler,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Self {
        Self { crawler: Crawler::new().with_fetch_config(config.fetch_config()) }
    }
}

#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkdownRequest {
    pub html: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    pub url: Option<String>,
    pub html: Option<String>,
    pub flatten: Option<bool>,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/crawl", post(crawl))
        .route("/markdown", post(markdown))
        .route("/metadata", post(metadata))
        .route("/health", get(health))
        .layer(TimeoutLayer::with_status_code(StatusCode::GATEWAY_TIMEOUT, request_timeout))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A present, non-blank string field.
fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ApiError::required(field)),
    }
}

/// Handler for `POST /crawl`
async fn crawl(
    State(state): State<AppState>, Json(request): Json<CrawlRequest>,
) -> Result<Json<CrawlResult>, ApiError> {
    let url = required(request.url, "url")?;
    let html = fetch_url(&url, state.crawler.fetch_config()).await?;

    let crawler = state.crawler.clone();
    let result = tokio::task::spawn_blocking(move || crawler.crawl_html(&html, &url)).await??;

    Ok(Json(result))
}

/// Handler for `POST /markdown`
async fn markdown(
    State(state): State<AppState>, Json(request): Json<MarkdownRequest>,
) -> Result<Json<Value>, ApiError> {
    let html = request.html.ok_or_else(|| ApiError::required("html"))?;

    let crawler = state.crawler.clone();
    let markdown = tokio::task::spawn_blocking(move || crawler.markdown(&html)).await?;

    Ok(Json(json!({ "markdown": markdown })))
}

/// Handler for `POST /metadata`
///
/// Uses `html` when given, otherwise fetches `url`.
async fn metadata(
    State(state): State<AppState>, Json(request): Json<MetadataRequest>,
) -> Result<Json<Value>, ApiError> {
    let html = match (request.html, request.url) {
        (Some(html), _) => html,
        (None, url) => {
            let url = required(url, "url or html")?;
            fetch_url(&url, state.crawler.fetch_config()).await?
        }
    };

    let crawler = state.crawler.clone();
    let entries: Vec<MetadataEntry> = tokio::task::spawn_blocking(move || crawler.metadata_entries(&html)).await?;

    let body = if request.flatten.unwrap_or(true) {
        Value::Object(flatten(&entries, state.crawler.flatten_policy()))
    } else {
        serde_json::to_value(&entries).map_err(crawlmark_core::CrawlError::from)?
    };

    Ok(Json(body))
}

/// Handler for `GET /health`
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
