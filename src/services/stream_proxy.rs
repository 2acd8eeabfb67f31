//! Streaming proxy for player traffic
//!
//! Playlists are buffered and rewritten so every reference is absolute;
//! everything else is forwarded chunk by chunk as it arrives. A binary stream
//! is tied to a [`StreamLease`]: when the client goes away axum drops the body,
//! the lease drops with it and the upstream request is aborted.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, Response, StatusCode, header};
use bytes::Bytes;
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::fetcher::{ByteStream, FetchPurpose, FetchedResponse, PlaylistFetcher};
use super::source_policy::SourcePolicy;
use super::stream_registry::{EndReason, StreamLease, StreamRegistry};
use crate::errors::{AppError, AppResult};
use crate::playlist::rewrite_playlist;
use crate::utils::url::UrlUtils;

pub const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
const DEFAULT_SEGMENT_CONTENT_TYPE: &str = "video/mp2t";

/// Content types that say nothing about the payload
const GENERIC_CONTENT_TYPES: &[&str] = &[
    "",
    "application/octet-stream",
    "binary/octet-stream",
    "text/plain",
];

/// Upstream headers copied onto a binary passthrough response
const PASSTHROUGH_HEADERS: &[header::HeaderName] = &[
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::CONTENT_ENCODING,
    header::CACHE_CONTROL,
    header::ETAG,
    header::LAST_MODIFIED,
];

/// Decide between the rewrite branch and the passthrough branch.
///
/// A specific content type is authoritative; a generic or missing one falls
/// back to the `.m3u8`/`.m3u` suffix of any of `urls`.
pub fn is_playlist_response(content_type: Option<&str>, urls: &[&str]) -> bool {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if essence.contains("mpegurl") {
        return true;
    }
    if GENERIC_CONTENT_TYPES.contains(&essence.as_str()) {
        return urls.iter().any(|u| UrlUtils::has_playlist_extension(u));
    }
    false
}

#[derive(Clone)]
pub struct StreamProxyService {
    policy: Arc<SourcePolicy>,
    fetcher: Arc<PlaylistFetcher>,
    registry: StreamRegistry,
    max_playlist_bytes: usize,
}

impl StreamProxyService {
    pub fn new(
        policy: Arc<SourcePolicy>,
        fetcher: Arc<PlaylistFetcher>,
        registry: StreamRegistry,
        max_playlist_bytes: usize,
    ) -> Self {
        Self {
            policy,
            fetcher,
            registry,
            max_playlist_bytes,
        }
    }

    /// Proxy one playlist or segment request.
    ///
    /// Errors are only possible before headers are committed; once a binary
    /// body is streaming, upstream failures end the stream instead.
    pub async fn proxy(&self, url: &str, inbound: &HeaderMap) -> AppResult<Response<Body>> {
        self.policy.validate(url)?;
        let requested = url.trim();

        // Playlists are always fetched whole; a partial one cannot be rewritten.
        let purpose = if UrlUtils::has_playlist_extension(requested) {
            FetchPurpose::Playlist
        } else {
            FetchPurpose::Proxy
        };
        let fetched = self
            .fetcher
            .fetch(requested, inbound, purpose)
            .await?
            .error_for_status()?;

        if !is_playlist_response(fetched.content_type(), &[requested, fetched.final_url.as_str()]) {
            return self.passthrough(fetched);
        }

        if fetched.status() == StatusCode::PARTIAL_CONTENT {
            let final_url = fetched.final_url.clone();
            drop(fetched);
            debug!(
                "Upstream sent a partial playlist for {}, fetching it whole",
                UrlUtils::obfuscate_credentials(&final_url)
            );
            let whole = self
                .fetcher
                .fetch(&final_url, inbound, FetchPurpose::Playlist)
                .await?
                .error_for_status()?;
            return self.rewritten_playlist(whole).await;
        }
        self.rewritten_playlist(fetched).await
    }

    async fn rewritten_playlist(&self, fetched: FetchedResponse) -> AppResult<Response<Body>> {
        let final_url = fetched.final_url.clone();
        let text = fetched.read_text(self.max_playlist_bytes).await?;
        let rewritten = rewrite_playlist(&text, &final_url);

        debug!(
            "Rewrote playlist {} ({} bytes)",
            UrlUtils::obfuscate_credentials(&final_url),
            rewritten.len()
        );

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, PLAYLIST_CONTENT_TYPE)
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from(rewritten))
            .map_err(|e| AppError::internal(format!("Failed to build playlist response: {e}")))
    }

    fn passthrough(&self, fetched: FetchedResponse) -> AppResult<Response<Body>> {
        let status = if fetched.status() == StatusCode::PARTIAL_CONTENT {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        };

        let content_type = fetched
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_SEGMENT_CONTENT_TYPE));

        // Content-Length is never forwarded: it disagrees with chunked upstreams and stalls players.
        let mut builder = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, content_type);
        for name in PASSTHROUGH_HEADERS {
            if let Some(value) = fetched.headers().get(name) {
                builder = builder.header(name, value.clone());
            }
        }

        let lease = self
            .registry
            .register(UrlUtils::obfuscate_credentials(&fetched.final_url));
        info!(
            "Streaming {} ({}) as stream {}",
            UrlUtils::obfuscate_credentials(&fetched.final_url),
            status,
            lease.id()
        );

        let idle_timeout = self.fetcher.timeout();
        let body = Body::from_stream(forward_chunks(
            fetched.into_byte_stream(),
            lease,
            idle_timeout,
        ));
        builder
            .body(body)
            .map_err(|e| AppError::internal(format!("Failed to build stream response: {e}")))
    }
}

enum Step {
    Cancelled,
    Stalled,
    Chunk(Option<reqwest::Result<Bytes>>),
}

/// Forward upstream chunks in order until upstream ends, fails, stalls, or the
/// lease is cancelled.
///
/// A stall is `idle_timeout` without a new chunk. The stream owns the lease:
/// dropping the stream (client disconnect) drops the lease and the upstream
/// body together.
fn forward_chunks(
    mut upstream: ByteStream,
    mut lease: StreamLease,
    idle_timeout: Duration,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send {
    async_stream::stream! {
        let token = lease.token();
        loop {
            let step = tokio::select! {
                biased;
                _ = token.cancelled() => Step::Cancelled,
                chunk = tokio::time::timeout(idle_timeout, upstream.next()) => match chunk {
                    Ok(chunk) => Step::Chunk(chunk),
                    Err(_) => Step::Stalled,
                },
            };

            match step {
                Step::Chunk(Some(Ok(bytes))) => {
                    lease.record_bytes(bytes.len());
                    yield Ok::<Bytes, std::io::Error>(bytes);
                }
                Step::Chunk(Some(Err(e))) => {
                    warn!(
                        "Upstream stream {} failed after {} bytes: {}",
                        lease.id(),
                        lease.bytes_forwarded(),
                        UrlUtils::obfuscate_credentials(&e.to_string())
                    );
                    lease.finish(EndReason::UpstreamFailed);
                    break;
                }
                Step::Chunk(None) => {
                    lease.finish(EndReason::Completed);
                    break;
                }
                Step::Stalled => {
                    warn!(
                        "Upstream stream {} sent nothing for {}ms after {} bytes",
                        lease.id(),
                        idle_timeout.as_millis(),
                        lease.bytes_forwarded()
                    );
                    lease.finish(EndReason::UpstreamStalled);
                    break;
                }
                Step::Cancelled => {
                    let reason = lease.cancellation_reason();
                    lease.finish(reason);
                    break;
                }
            }
        }
    }
}
