use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::duration;

/// Environment variable prefix; `HLS_PREVIEW_UPSTREAM__TIMEOUT=30s` sets `upstream.timeout`
pub const ENV_PREFIX: &str = "HLS_PREVIEW_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Externally reachable address, only used in startup log output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

/// Settings for every outbound fetch (analysis and proxy)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Hard limit from request start until response headers (and, for
    /// playlists, the complete body) have arrived
    #[serde(default = "default_upstream_timeout", with = "duration")]
    pub timeout: Duration,
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Upper bound when buffering playlist text
    #[serde(default = "default_max_playlist_bytes")]
    pub max_playlist_bytes: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    #[serde(default = "default_accept_encoding")]
    pub accept_encoding: String,
    #[serde(default = "default_connection")]
    pub connection: String,
}

/// External transcoding worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    #[serde(default = "default_worker_url")]
    pub worker_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Host substrings that are never analysed, proxied or handed to the worker
    #[serde(default = "default_blocked_domains")]
    pub blocked_domains: Vec<String>,
}

fn default_host() -> String { DEFAULT_HOST.to_string() }
fn default_port() -> u16 { DEFAULT_PORT }
fn default_upstream_timeout() -> Duration { parse_default(DEFAULT_UPSTREAM_TIMEOUT) }
fn default_connect_timeout() -> Duration { parse_default(DEFAULT_CONNECT_TIMEOUT) }
fn default_max_redirects() -> usize { DEFAULT_MAX_REDIRECTS }
fn default_max_playlist_bytes() -> usize { DEFAULT_MAX_PLAYLIST_BYTES }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.to_string() }
fn default_accept() -> String { DEFAULT_ACCEPT.to_string() }
fn default_accept_language() -> String { DEFAULT_ACCEPT_LANGUAGE.to_string() }
fn default_accept_encoding() -> String { DEFAULT_ACCEPT_ENCODING.to_string() }
fn default_connection() -> String { DEFAULT_CONNECTION.to_string() }
fn default_worker_url() -> String { DEFAULT_WORKER_URL.to_string() }
fn default_blocked_domains() -> Vec<String> {
    DEFAULT_BLOCKED_DOMAINS.iter().map(|d| d.to_string()).collect()
}

fn parse_default(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or(Duration::from_secs(15))
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_base_url: None,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            timeout: default_upstream_timeout(),
            connect_timeout: default_connect_timeout(),
            max_redirects: default_max_redirects(),
            max_playlist_bytes: default_max_playlist_bytes(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            accept_encoding: default_accept_encoding(),
            connection: default_connection(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            worker_url: default_worker_url(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            blocked_domains: default_blocked_domains(),
        }
    }
}

impl Config {
    /// Layered sources: defaults, then the TOML file (if it exists), then `HLS_PREVIEW_*` env vars.
    pub fn figment(config_file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(config_file: &Path) -> Result<Self> {
        let config: Config = Self::figment(config_file).extract()?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        let worker = url::Url::parse(&self.download.worker_url)
            .map_err(|e| format!("download.worker_url is not a valid URL: {e}"))?;
        if !matches!(worker.scheme(), "http" | "https") || worker.host_str().is_none() {
            return Err(format!(
                "download.worker_url must be an absolute http(s) URL, got '{}'",
                self.download.worker_url
            ));
        }
        if self.upstream.timeout.is_zero() {
            return Err("upstream.timeout must be greater than zero".to_string());
        }
        if self.upstream.connect_timeout.is_zero() {
            return Err("upstream.connect_timeout must be greater than zero".to_string());
        }
        if self.upstream.max_redirects == 0 {
            return Err("upstream.max_redirects must be at least 1".to_string());
        }
        if self.upstream.max_playlist_bytes == 0 {
            return Err("upstream.max_playlist_bytes must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.web.host, self.web.port)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(text: &str) -> Config {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(text))
            .extract()
            .unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.web.port, 8080);
        assert_eq!(config.upstream.timeout, Duration::from_secs(15));
        assert_eq!(config.upstream.max_redirects, 10);
        assert!(config.policy.blocked_domains.iter().any(|d| d == "netflix.com"));
    }

    #[test]
    fn toml_overrides_single_fields() {
        let config = from_toml(
            r#"
            [web]
            port = 9000

            [upstream]
            timeout = "30s"

            [policy]
            blocked_domains = ["blocked.example"]
            "#,
        );
        assert_eq!(config.web.port, 9000);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.upstream.timeout, Duration::from_secs(30));
        assert_eq!(config.upstream.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.policy.blocked_domains, vec!["blocked.example"]);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config: Config = Config::figment(Path::new("/nonexistent/hls-preview.toml"))
            .extract()
            .unwrap();
        assert_eq!(config.download.worker_url, DEFAULT_WORKER_URL);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.download.worker_url = "/relative/download".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upstream.timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.upstream.max_redirects = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn printed_config_round_trips() {
        let text = Config::default().to_toml().unwrap();
        assert!(text.contains("timeout = \"15s\""));
        let config = from_toml(&text);
        assert_eq!(config.upstream.timeout, Duration::from_secs(15));
        assert_eq!(config.web.port, 8080);
    }
}
