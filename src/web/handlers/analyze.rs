//! Playlist analysis endpoint

use axum::{
    extract::State,
    http::HeaderMap,
    response::Response,
};
use tracing::debug;

use crate::web::{
    AppState,
    extractors::{RequestContext, SourceParams},
    responses::handle_result,
};

/// `GET /api/v1/analyze?url=<playlist>`
///
/// Returns the [`PlaylistAnalysis`](crate::playlist::PlaylistAnalysis) in the
/// `data` field of the standard envelope.
pub async fn analyze_playlist(
    State(state): State<AppState>,
    context: RequestContext,
    headers: HeaderMap,
    params: SourceParams,
) -> Response {
    debug!(
        request_id = %context.request_id,
        real_ip = ?context.real_ip,
        user_agent = ?context.user_agent,
        "Analyze request"
    );
    handle_result(state.analysis.analyze(&params.url, &headers).await)
}
