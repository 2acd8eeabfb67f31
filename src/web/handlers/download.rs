//! Hand-off to the external transcoding worker

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::errors::AppResult;
use crate::utils::url::UrlUtils;
use crate::web::{
    AppState,
    extractors::SourceParams,
    responses::{DownloadLinkResponse, ok},
};

/// `GET /api/v1/download?url=..&quality=..`: 302 to the worker
pub async fn download_redirect(
    State(state): State<AppState>,
    params: SourceParams,
) -> AppResult<Response> {
    let link = state
        .download
        .build(&params.url, params.quality.as_deref())?;
    info!(
        "Redirecting download of {} to worker",
        UrlUtils::obfuscate_credentials(&params.url)
    );
    Ok((StatusCode::FOUND, [(header::LOCATION, link)]).into_response())
}

/// `GET /api/v1/download-link?url=..&quality=..`: the same target as JSON
pub async fn download_link(
    State(state): State<AppState>,
    params: SourceParams,
) -> AppResult<Response> {
    let url = state
        .download
        .build(&params.url, params.quality.as_deref())?;
    Ok(ok(DownloadLinkResponse { url }).into_response())
}
