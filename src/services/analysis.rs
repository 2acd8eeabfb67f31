//! "What is this stream": validate, fetch and parse one playlist.

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::info;

use super::fetcher::{FetchPurpose, PlaylistFetcher};
use super::source_policy::SourcePolicy;
use crate::errors::AppResult;
use crate::playlist::{PlaylistAnalysis, parse_playlist};
use crate::utils::url::UrlUtils;

#[derive(Clone)]
pub struct AnalysisService {
    policy: Arc<SourcePolicy>,
    fetcher: Arc<PlaylistFetcher>,
    max_playlist_bytes: usize,
}

impl AnalysisService {
    pub fn new(
        policy: Arc<SourcePolicy>,
        fetcher: Arc<PlaylistFetcher>,
        max_playlist_bytes: usize,
    ) -> Self {
        Self {
            policy,
            fetcher,
            max_playlist_bytes,
        }
    }

    /// Analyse the playlist at `url`.
    ///
    /// Policy checks run before any network call. Relative references are
    /// resolved against the address the playlist was finally served from.
    /// Nothing is cached: every call fetches afresh.
    pub async fn analyze(&self, url: &str, inbound: &HeaderMap) -> AppResult<PlaylistAnalysis> {
        self.policy.validate(url)?;

        let fetched = self
            .fetcher
            .fetch(url.trim(), inbound, FetchPurpose::Playlist)
            .await?
            .error_for_status()?;
        let final_url = fetched.final_url.clone();
        let text = fetched.read_text(self.max_playlist_bytes).await?;

        let analysis = parse_playlist(&text, &final_url)?;
        info!(
            "Analysed {}: {:?}, live={}, encrypted={}, {} quality option(s)",
            UrlUtils::obfuscate_credentials(&final_url),
            analysis.kind,
            analysis.is_live,
            analysis.is_encrypted,
            analysis.qualities.len()
        );
        Ok(analysis)
    }
}
