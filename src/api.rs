// src/api.rs
// HTTP boundary: request/response marshaling only. The core never surfaces a
// raw error; /query always answers with a structurally valid response body.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::agent::CryptoAgent;
use crate::models::{QueryRequest, QueryResponse};

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<CryptoAgent>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/query", post(process_query))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct RootInfo {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

async fn root() -> Json<RootInfo> {
    Json(RootInfo {
        status: "online",
        message: "crypto-news-agent is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthInfo {
    status: &'static str,
    timestamp: String,
}

async fn health() -> Json<HealthInfo> {
    Json(HealthInfo {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn process_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let started = std::time::Instant::now();
    let resp = state
        .agent
        .process_query(&req.query, req.min_articles, req.additional_context.as_ref())
        .await;
    info!(
        query = %req.query,
        articles = resp.articles.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "query request served"
    );
    Json(resp)
}
