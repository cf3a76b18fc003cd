//! Liveness endpoint.
//!
//! `GET /health` is deliberately independent of the identity service: a
//! Keystone outage degrades every request to `X-Identity-Status: Invalid`
//! but does not make this process unhealthy.

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "cache_enabled": true,
///   "cache_entries": 42,
///   "uptime_seconds": 3600,
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_enabled: state.cache_enabled(),
        cache_entries: state.cache_entries().await,
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
