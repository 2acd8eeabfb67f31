use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Response},
};

use crate::errors::AppResult;
use crate::web::{AppState, extractors::SourceParams};

/// `GET|HEAD /api/v1/proxy?url=<playlist or segment>`
///
/// Forwards `Range` and the browser headers; playlists come back rewritten,
/// anything else streams through unbuffered.
pub async fn proxy_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: SourceParams,
) -> AppResult<Response<Body>> {
    state.proxy.proxy(&params.url, &headers).await
}
