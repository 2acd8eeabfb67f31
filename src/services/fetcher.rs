//! Upstream HTTP fetching with browser-like headers and bounded redirects.
//!
//! Redirects are followed by hand rather than by reqwest so that relative
//! `Location` values go through [`UrlUtils`], headers survive every hop and the
//! final address is known to callers (playlist rewriting resolves against it).

use std::pin::Pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Response, StatusCode};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::errors::{AppError, AppResult, PlaylistError};
use crate::utils::url::UrlUtils;

/// Inbound headers copied verbatim onto upstream requests
const FORWARDED_HEADERS: &[HeaderName] = &[
    header::USER_AGENT,
    header::REFERER,
    header::ORIGIN,
    header::ACCEPT,
    header::ACCEPT_LANGUAGE,
    header::ACCEPT_ENCODING,
    header::CONNECTION,
    header::COOKIE,
];

/// What the fetch is for; decides whether `Range` is forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPurpose {
    /// Full playlist body wanted, never partial
    Playlist,
    /// Player traffic, partial content allowed
    Proxy,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Upstream response whose headers have arrived; the body is still unread.
pub struct FetchedResponse {
    /// Address that produced the response, after redirects
    pub final_url: String,
    deadline: Instant,
    timeout: Duration,
    response: Response,
}

impl FetchedResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Fail unless upstream answered 2xx.
    pub fn error_for_status(self) -> AppResult<Self> {
        let status = self.status();
        if status.is_success() {
            Ok(self)
        } else {
            warn!(
                "Upstream responded {} for {}",
                status,
                UrlUtils::obfuscate_credentials(&self.final_url)
            );
            Err(AppError::from_upstream_status(status.as_u16(), &self.final_url))
        }
    }

    /// Buffer the body as text, bounded by `max_bytes` and the remaining fetch deadline.
    pub async fn read_text(self, max_bytes: usize) -> AppResult<String> {
        let FetchedResponse {
            final_url,
            deadline,
            timeout,
            mut response,
        } = self;

        let read = async {
            let mut buffer = BytesMut::new();
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| map_reqwest_error(e, &final_url, timeout))?
            {
                if buffer.len() + chunk.len() > max_bytes {
                    return Err(AppError::InvalidPlaylist(PlaylistError::TooLarge {
                        limit: max_bytes,
                    }));
                }
                buffer.extend_from_slice(&chunk);
            }
            Ok::<Bytes, AppError>(buffer.freeze())
        };

        let body = tokio::time::timeout_at(deadline, read)
            .await
            .map_err(|_| timeout_error(&final_url, timeout))??;

        debug!("Read {} bytes of playlist text", body.len());
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Hand the body over as an unbuffered chunk stream.
    ///
    /// The fetch deadline no longer applies; callers bound the gap between chunks.
    pub fn into_byte_stream(self) -> ByteStream {
        Box::pin(self.response.bytes_stream())
    }
}

/// HTTP client for playlists and segments
pub struct PlaylistFetcher {
    client: Client,
    config: UpstreamConfig,
}

impl PlaylistFetcher {
    pub fn new(config: &UpstreamConfig) -> AppResult<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Upstream header set: allowlisted inbound headers, then browser defaults for the gaps.
    pub fn build_headers(&self, inbound: &HeaderMap, purpose: FetchPurpose) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for name in FORWARDED_HEADERS {
            if let Some(value) = inbound.get(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        if purpose == FetchPurpose::Proxy
            && let Some(range) = inbound.get(header::RANGE)
        {
            headers.insert(header::RANGE, range.clone());
        }

        let defaults = [
            (header::USER_AGENT, &self.config.user_agent),
            (header::ACCEPT, &self.config.accept),
            (header::ACCEPT_LANGUAGE, &self.config.accept_language),
            (header::ACCEPT_ENCODING, &self.config.accept_encoding),
            (header::CONNECTION, &self.config.connection),
        ];
        for (name, value) in defaults {
            if headers.contains_key(&name) || value.trim().is_empty() {
                continue;
            }
            match HeaderValue::from_str(value.trim()) {
                Ok(v) => {
                    headers.insert(name, v);
                }
                Err(e) => debug!("Skipping default header {}: {}", name, e),
            }
        }

        headers
    }

    /// GET `url`, following up to `max_redirects` redirects.
    ///
    /// The configured timeout covers the whole exchange up to response headers,
    /// including every redirect hop. The query string of `url` is sent as given.
    pub async fn fetch(
        &self,
        url: &str,
        inbound: &HeaderMap,
        purpose: FetchPurpose,
    ) -> AppResult<FetchedResponse> {
        let timeout = self.config.timeout;
        let deadline = Instant::now() + timeout;
        let headers = self.build_headers(inbound, purpose);

        debug!(
            "Fetching {:?} {}",
            purpose,
            UrlUtils::obfuscate_credentials(url)
        );

        let (final_url, response) = tokio::time::timeout_at(deadline, self.follow(url, headers))
            .await
            .map_err(|_| timeout_error(url, timeout))??;

        Ok(FetchedResponse {
            final_url,
            deadline,
            timeout,
            response,
        })
    }

    async fn follow(&self, url: &str, headers: HeaderMap) -> AppResult<(String, Response)> {
        let mut current = url.trim().to_string();

        for hop in 0..=self.config.max_redirects {
            let response = self
                .client
                .get(current.as_str())
                .headers(headers.clone())
                .send()
                .await
                .map_err(|e| map_reqwest_error(e, &current, self.config.timeout))?;

            let status = response.status();
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());

            let Some(location) = location.filter(|_| status.is_redirection()) else {
                return Ok((current, response));
            };

            if hop == self.config.max_redirects {
                break;
            }

            let next = UrlUtils::try_resolve(&current, &location)
                .ok()
                .filter(|next| UrlUtils::parse_http_url(next).is_some())
                .ok_or_else(|| AppError::UpstreamError {
                    status: status.as_u16(),
                    message: "redirect to an unusable location".to_string(),
                })?;
            debug!(
                "Following {} redirect to {}",
                status,
                UrlUtils::obfuscate_credentials(&next)
            );
            current = next;
        }

        Err(AppError::UpstreamError {
            status: StatusCode::LOOP_DETECTED.as_u16(),
            message: format!("more than {} redirects", self.config.max_redirects),
        })
    }
}

fn timeout_error(url: &str, timeout: Duration) -> AppError {
    AppError::Timeout {
        url: url.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}

fn map_reqwest_error(err: reqwest::Error, url: &str, timeout: Duration) -> AppError {
    let message = UrlUtils::obfuscate_credentials(&err.to_string());
    if err.is_timeout() && !err.is_connect() {
        return timeout_error(url, timeout);
    }
    warn!(
        "Upstream request failed for {}: {}",
        UrlUtils::obfuscate_credentials(url),
        message
    );
    AppError::transport(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> PlaylistFetcher {
        PlaylistFetcher::new(&UpstreamConfig::default()).unwrap()
    }

    fn inbound(pairs: &[(HeaderName, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn missing_headers_fall_back_to_browser_defaults() {
        let headers = fetcher().build_headers(&HeaderMap::new(), FetchPurpose::Playlist);
        assert!(headers[header::USER_AGENT].to_str().unwrap().starts_with("Mozilla/5.0"));
        assert_eq!(headers[header::ACCEPT], "*/*");
        assert!(headers.contains_key(header::ACCEPT_LANGUAGE));
        assert!(!headers.contains_key(header::REFERER));
    }

    #[test]
    fn inbound_allowlisted_headers_pass_verbatim() {
        let headers = fetcher().build_headers(
            &inbound(&[
                (header::USER_AGENT, "VLC/3.0.20"),
                (header::REFERER, "https://site.example.com/watch"),
                (header::COOKIE, "session=abc"),
                (header::AUTHORIZATION, "Bearer nope"),
                (header::HOST, "localhost:8080"),
            ]),
            FetchPurpose::Playlist,
        );
        assert_eq!(headers[header::USER_AGENT], "VLC/3.0.20");
        assert_eq!(headers[header::REFERER], "https://site.example.com/watch");
        assert_eq!(headers[header::COOKIE], "session=abc");
        assert!(!headers.contains_key(header::AUTHORIZATION));
        assert!(!headers.contains_key(header::HOST));
    }

    #[test]
    fn range_only_forwarded_for_proxy() {
        let range = inbound(&[(header::RANGE, "bytes=100-")]);
        let f = fetcher();
        assert!(!f.build_headers(&range, FetchPurpose::Playlist).contains_key(header::RANGE));
        assert_eq!(f.build_headers(&range, FetchPurpose::Proxy)[header::RANGE], "bytes=100-");
    }

    #[tokio::test]
    async fn connection_refused_is_transport_error() {
        let err = fetcher()
            .fetch("http://127.0.0.1:9/none.m3u8", &HeaderMap::new(), FetchPurpose::Playlist)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::TransportError { .. } | AppError::Timeout { .. }));
    }
}
