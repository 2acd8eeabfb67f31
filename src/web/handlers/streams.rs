//! Active stream listing for monitoring

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::web::{
    AppState,
    responses::{ActiveStreamsResponse, ok},
};

/// `GET /api/v1/active-streams`
pub async fn active_streams(State(state): State<AppState>) -> Response {
    let streams = state.registry.active_streams();
    debug!("Listing {} active stream(s)", streams.len());

    ok(ActiveStreamsResponse {
        total_active: streams.len(),
        total_bytes_forwarded: streams.iter().map(|s| s.bytes_forwarded).sum(),
        streams,
    })
    .into_response()
}
