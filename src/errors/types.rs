//! Error type definitions for the HLS preview service

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level application error type
///
/// Variants correspond one-to-one with [`ErrorKind`]; all of them are terminal
/// for the current request and none are retried by the service.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing URL parameter
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Source domain is on the configured denylist
    #[error("Source not allowed: {host}")]
    Forbidden { host: String },

    /// Upstream answered 401/403, usually because it needs session cookies
    #[error("Access denied by upstream ({status}) for {url}")]
    AccessDenied { status: u16, url: String },

    /// Upstream answered with any other non-success status
    #[error("Upstream error: {status} - {message}")]
    UpstreamError { status: u16, message: String },

    /// Body lacks the `#EXTM3U` marker or is too large to buffer
    #[error("Invalid playlist: {0}")]
    InvalidPlaylist(#[from] PlaylistError),

    /// No upstream response inside the configured budget
    #[error("Upstream timed out after {timeout_ms}ms: {url}")]
    Timeout { url: String, timeout_ms: u64 },

    /// DNS, connect or TLS failure
    #[error("Transport error: {message}")]
    TransportError { message: String },

    /// Server-side fault (building a response, bad configuration)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised by the pure playlist parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("missing #EXTM3U marker")]
    MissingMarker,
    #[error("playlist exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

/// Machine-readable error kind carried in every error payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Forbidden,
    AccessDenied,
    UpstreamError,
    InvalidPlaylist,
    Timeout,
    TransportError,
    Internal,
}

impl ErrorKind {
    /// HTTP status returned to the client for this kind
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::AccessDenied => StatusCode::UNAUTHORIZED,
            ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
            ErrorKind::InvalidPlaylist => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::TransportError => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed guidance shown to the user for this kind
    pub fn hint(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => {
                "Enter a full http:// or https:// link to an .m3u8 playlist."
            }
            ErrorKind::Forbidden => {
                "This service does not support subscription streaming platforms."
            }
            ErrorKind::AccessDenied => {
                "The stream requires an active session (cookies or signed tokens). Open it in the original site and copy a fresh playlist link."
            }
            ErrorKind::UpstreamError => {
                "The stream server returned an error. The link may have expired or been removed."
            }
            ErrorKind::InvalidPlaylist => {
                "The link did not return an HLS playlist. Make sure it points at the .m3u8 file."
            }
            ErrorKind::Timeout => "The stream server took too long to respond. Try again shortly.",
            ErrorKind::TransportError => {
                "Could not connect to the stream server. Check the address and try again."
            }
            ErrorKind::Internal => "Something went wrong on our side. Try again.",
        }
    }
}

impl AppError {
    /// Create an invalid input error with a custom message
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn forbidden<S: Into<String>>(host: S) -> Self {
        Self::Forbidden { host: host.into() }
    }

    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Map a non-success upstream status onto the taxonomy.
    ///
    /// 401 and 403 are distinguished as [`AppError::AccessDenied`]; anything else is an
    /// [`AppError::UpstreamError`].
    pub fn from_upstream_status(status: u16, url: &str) -> Self {
        match status {
            401 | 403 => Self::AccessDenied {
                status,
                url: url.to_string(),
            },
            _ => Self::UpstreamError {
                status,
                message: format!("unexpected status for {url}"),
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput { .. } => ErrorKind::InvalidInput,
            AppError::Forbidden { .. } => ErrorKind::Forbidden,
            AppError::AccessDenied { .. } => ErrorKind::AccessDenied,
            AppError::UpstreamError { .. } => ErrorKind::UpstreamError,
            AppError::InvalidPlaylist(_) => ErrorKind::InvalidPlaylist,
            AppError::Timeout { .. } => ErrorKind::Timeout,
            AppError::TransportError { .. } => ErrorKind::TransportError,
            AppError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Message safe to put in a response body.
    ///
    /// Upstream URLs are left out so signed query strings never leak back into
    /// client-side logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput { message } => message.clone(),
            AppError::Forbidden { host } => format!("Streams from '{host}' are not supported"),
            AppError::AccessDenied { status, .. } => format!(
                "Upstream denied access ({status}); the resource likely requires session credentials"
            ),
            AppError::UpstreamError { status, .. } => {
                format!("Upstream responded with status {status}")
            }
            AppError::InvalidPlaylist(err) => format!("Not an HLS playlist: {err}"),
            AppError::Timeout { timeout_ms, .. } => {
                format!("Upstream did not respond within {timeout_ms}ms")
            }
            AppError::TransportError { message } => format!("Could not reach upstream: {message}"),
            AppError::Internal { .. } => "Internal server error".to_string(),
        }
    }
}
