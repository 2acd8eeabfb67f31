use axum::{Json, extract::State};

use crate::web::{AppState, responses::HealthResponse};

/// Liveness plus a count of streams currently being proxied
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - state.start_time;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_streams: state.registry.active_count(),
        uptime_seconds: uptime.num_seconds().max(0) as u64,
    })
}
