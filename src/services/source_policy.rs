//! Source URL validation and the shared domain denylist.

use tracing::info;
use url::Url;

use crate::config::PolicyConfig;
use crate::errors::{AppError, AppResult};
use crate::utils::url::UrlUtils;

/// Checks applied to every user-supplied source URL before any network call.
#[derive(Debug, Clone)]
pub struct SourcePolicy {
    blocked_domains: Vec<String>,
}

impl SourcePolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        let blocked_domains = config
            .blocked_domains
            .iter()
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { blocked_domains }
    }

    /// Parse `raw` as an absolute http(s) URL and reject denylisted hosts.
    pub fn validate(&self, raw: &str) -> AppResult<Url> {
        if raw.trim().is_empty() {
            return Err(AppError::invalid_input("url parameter is required"));
        }
        let url = UrlUtils::parse_http_url(raw).ok_or_else(|| {
            AppError::invalid_input("url must be an absolute http:// or https:// URL")
        })?;

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        if self.is_blocked(&host) {
            info!("Rejected denylisted source host {}", host);
            return Err(AppError::forbidden(host));
        }
        Ok(url)
    }

    /// Substring match against the lowercase host.
    pub fn is_blocked(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.blocked_domains.iter().any(|d| host.contains(d.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use rstest::rstest;

    fn policy() -> SourcePolicy {
        SourcePolicy::new(&PolicyConfig::default())
    }

    #[rstest]
    #[case("https://www.netflix.com/watch/1")]
    #[case("https://ipv4-c001.1.oca.nflxvideo.net/range/0-1")]
    #[case("https://VOD.HULU.COM/master.m3u8")]
    #[case("https://play.max.com/video/x")]
    fn denylisted_hosts_are_forbidden(#[case] url: &str) {
        let err = policy().validate(url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[rstest]
    #[case("https://cdn.example.com/master.m3u8")]
    #[case("https://www.apple.com/stream/index.m3u8")]
    #[case("http://maxcdn.example.org/live.m3u8")]
    fn other_hosts_pass(#[case] url: &str) {
        assert!(policy().validate(url).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("cdn.example.com/a.m3u8")]
    #[case("ftp://cdn.example.com/a.m3u8")]
    #[case("javascript:alert(1)")]
    fn malformed_input_is_invalid(#[case] url: &str) {
        let err = policy().validate(url).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn configured_list_replaces_default() {
        let policy = SourcePolicy::new(&PolicyConfig {
            blocked_domains: vec![" Blocked.Example ".to_string(), String::new()],
        });
        assert!(policy.is_blocked("cdn.blocked.example"));
        assert!(!policy.is_blocked("netflix.com"));
        assert!(!policy.is_blocked("anything.example.org"));
    }

    #[test]
    fn query_string_is_preserved() {
        let url = policy()
            .validate("https://cdn.example.com/a.m3u8?token=x%2Fy&exp=1")
            .unwrap();
        assert_eq!(url.query(), Some("token=x%2Fy&exp=1"));
    }
}
