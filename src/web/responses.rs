//! HTTP response types and utilities
//!
//! Every JSON endpoint answers with [`ApiResponse`]. Failures additionally
//! carry the machine-readable [`ErrorKind`] and its fixed user guidance.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::errors::{AppError, AppResult, ErrorKind};
use crate::services::StreamInfo;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error kind (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Pre-written guidance for the user (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Response timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            kind: None,
            hint: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(kind: ErrorKind, message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            kind: Some(kind),
            hint: Some(kind.hint().to_string()),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Helper function to convert AppResult to HTTP response
pub fn handle_result<T>(result: AppResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(data) => ok(data).into_response(),
        Err(error) => handle_error(error),
    }
}

/// Convert AppError to its HTTP status and JSON payload
pub fn handle_error(error: AppError) -> Response {
    let kind = error.kind();
    let status = kind.status_code();

    if kind == ErrorKind::Internal {
        error!("Request failed: {}", error);
    } else {
        warn!("Request failed ({:?}): {}", kind, error.public_message());
    }

    (status, Json(ApiResponse::<()>::failure(kind, error.public_message()))).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        handle_error(self)
    }
}

pub fn ok<T: Serialize>(data: T) -> impl IntoResponse {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

/// Health endpoint payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_streams: usize,
    pub uptime_seconds: u64,
}

/// Active-streams endpoint payload
#[derive(Debug, Clone, Serialize)]
pub struct ActiveStreamsResponse {
    pub total_active: usize,
    pub total_bytes_forwarded: u64,
    pub streams: Vec<StreamInfo>,
}

/// Download-link endpoint payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLinkResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PlaylistError;

    #[test]
    fn failure_payload_carries_kind_and_hint() {
        let payload = ApiResponse::<()>::failure(ErrorKind::Forbidden, "nope".to_string());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "forbidden");
        assert_eq!(json["error"], "nope");
        assert!(json["hint"].as_str().unwrap().contains("subscription"));
        assert!(json.get("data").is_none());
    }

    #[test]
    fn error_status_follows_kind() {
        let response = handle_error(AppError::InvalidPlaylist(PlaylistError::MissingMarker));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = AppError::Timeout {
            url: "https://cdn.example.com/a.m3u8".to_string(),
            timeout_ms: 15_000,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn success_payload_omits_error_fields() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 42);
        assert!(json.get("kind").is_none());
        assert!(json.get("hint").is_none());
    }
}
