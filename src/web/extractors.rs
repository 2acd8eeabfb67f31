//! Request extractors and validation

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::web::middleware::RequestId;

/// `?url=...&quality=...` on the analyze, proxy and download endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceQuery {
    pub url: Option<String>,
    pub quality: Option<String>,
}

/// Validated source parameters: `url` is present and non-blank
#[derive(Debug, Clone)]
pub struct SourceParams {
    pub url: String,
    pub quality: Option<String>,
}

impl<S> FromRequestParts<S> for SourceParams
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<SourceQuery>::try_from_uri(&parts.uri)
            .map_err(|e| AppError::invalid_input(format!("Invalid query string: {e}")))?;

        let url = query
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::invalid_input("url parameter is required"))?;
        let quality = query
            .quality
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        Ok(Self { url, quality })
    }
}

/// Request context extracted from headers
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub real_ip: Option<String>,
    pub request_id: String,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let real_ip = parts
            .headers
            .get("x-real-ip")
            .or_else(|| parts.headers.get("x-forwarded-for"))
            .and_then(|h| h.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

        let request_id = parts
            .extensions
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(Self {
            user_agent,
            real_ip,
            request_id,
        })
    }
}
