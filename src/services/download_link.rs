//! Redirect targets for the external transcoding worker.

use std::sync::Arc;

use url::Url;

use super::source_policy::SourcePolicy;
use crate::errors::{AppError, AppResult};

#[derive(Clone)]
pub struct DownloadLinkBuilder {
    policy: Arc<SourcePolicy>,
    worker_url: String,
}

impl DownloadLinkBuilder {
    /// `worker_url` must be an absolute http(s) URL; it may carry its own query.
    pub fn new(policy: Arc<SourcePolicy>, worker_url: &str) -> AppResult<Self> {
        let parsed = Url::parse(worker_url.trim())
            .map_err(|e| AppError::internal(format!("Invalid download worker URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::internal("Download worker URL must be http(s)"));
        }
        Ok(Self {
            policy,
            worker_url: worker_url.trim().to_string(),
        })
    }

    /// Compose `<worker>?url=<enc>[&quality=<enc>]`.
    ///
    /// Both URLs get the same checks as analysis. Values are percent-encoded
    /// so their own query strings cannot bleed into the worker's.
    pub fn build(&self, playlist_url: &str, quality_url: Option<&str>) -> AppResult<String> {
        self.policy.validate(playlist_url)?;
        let quality_url = quality_url.map(str::trim).filter(|q| !q.is_empty());
        if let Some(quality) = quality_url {
            self.policy.validate(quality)?;
        }

        let separator = if self.worker_url.contains('?') { '&' } else { '?' };
        let mut link = format!(
            "{}{}url={}",
            self.worker_url,
            separator,
            urlencoding::encode(playlist_url.trim())
        );
        if let Some(quality) = quality_url {
            link.push_str("&quality=");
            link.push_str(&urlencoding::encode(quality));
        }
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::errors::ErrorKind;

    fn builder(worker: &str) -> DownloadLinkBuilder {
        DownloadLinkBuilder::new(Arc::new(SourcePolicy::new(&PolicyConfig::default())), worker)
            .unwrap()
    }

    #[test]
    fn encodes_nested_query_strings() {
        let link = builder("http://worker.local/download")
            .build(
                "https://cdn.example.com/master.m3u8?token=a&exp=1",
                Some("https://cdn.example.com/720p/index.m3u8?token=a"),
            )
            .unwrap();
        assert_eq!(
            link,
            "http://worker.local/download?url=https%3A%2F%2Fcdn.example.com%2Fmaster.m3u8%3Ftoken%3Da%26exp%3D1&quality=https%3A%2F%2Fcdn.example.com%2F720p%2Findex.m3u8%3Ftoken%3Da"
        );
    }

    #[test]
    fn quality_is_optional() {
        let link = builder("http://worker.local/download")
            .build("https://cdn.example.com/a.m3u8", Some("  "))
            .unwrap();
        assert_eq!(
            link,
            "http://worker.local/download?url=https%3A%2F%2Fcdn.example.com%2Fa.m3u8"
        );
    }

    #[test]
    fn appends_to_existing_worker_query() {
        let link = builder("https://worker.example.com/dl?format=mp4")
            .build("https://cdn.example.com/a.m3u8", None)
            .unwrap();
        assert!(link.starts_with("https://worker.example.com/dl?format=mp4&url="));
    }

    #[test]
    fn applies_source_policy() {
        let b = builder("http://worker.local/download");
        assert_eq!(
            b.build("not a url", None).unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            b.build("https://www.netflix.com/title/1", None).unwrap_err().kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            b.build(
                "https://cdn.example.com/a.m3u8",
                Some("https://hulu.com/variant.m3u8")
            )
            .unwrap_err()
            .kind(),
            ErrorKind::Forbidden
        );
    }

    #[test]
    fn rejects_non_http_worker() {
        let policy = Arc::new(SourcePolicy::new(&PolicyConfig::default()));
        assert!(DownloadLinkBuilder::new(policy.clone(), "ftp://worker/dl").is_err());
        assert!(DownloadLinkBuilder::new(policy, "/download").is_err());
    }
}
