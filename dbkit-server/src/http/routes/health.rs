//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub connected: bool,
}

/// GET /health
///
/// Always 200; an unreachable database only downgrades `status`.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let connected = state.db.validity().await;
    if !connected {
        tracing::warn!("health check: database unreachable");
    }
    Json(HealthResponse {
        status: if connected { "ok" } else { "degraded" },
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        database: DatabaseHealth { connected },
    })
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
