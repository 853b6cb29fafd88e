use std::sync::Arc;
use std::sync::OnceLock;
use std::time::Instant;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::ServerState;

static SERVER_START_TIME: OnceLock<Instant> = OnceLock::new();

pub(crate) fn mark_started() {
    SERVER_START_TIME.get_or_init(Instant::now);
}

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .get_or_init(Instant::now)
        .elapsed()
        .as_secs()
}

/// Health check endpoint (liveness)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "ride-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let matching = state.matcher.config();
    Json(json!({
        "status": "ready",
        "service": "ride-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds(),
        "matching": {
            "default_tolerance_m": matching.default_tolerance_m,
            "route_timeout_ms": matching.route_timeout_ms,
            "max_concurrent_route_fetches": matching.max_concurrent_route_fetches,
        }
    }))
}
