/// Configuration default values
///
/// Every default lives here so it can be changed in one place.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Upstream fetch defaults
pub const DEFAULT_UPSTREAM_TIMEOUT: &str = "15s";
pub const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
pub const DEFAULT_MAX_REDIRECTS: usize = 10;
pub const DEFAULT_MAX_PLAYLIST_BYTES: usize = 8 * 1024 * 1024; // 8MB

// Browser-like header set sent when the inbound request lacks one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT: &str = "*/*";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip, deflate, br";
pub const DEFAULT_CONNECTION: &str = "keep-alive";

// Download worker defaults
pub const DEFAULT_WORKER_URL: &str = "http://127.0.0.1:8081/download";

// Subscription-video domains; matched as substrings of the lowercase host
pub const DEFAULT_BLOCKED_DOMAINS: &[&str] = &[
    "netflix.com",
    "nflxvideo.net",
    "hulu.com",
    "disneyplus.com",
    "dssott.com",
    "hbomax.com",
    "play.max.com",
    "primevideo.com",
    "peacocktv.com",
    "paramountplus.com",
    "crunchyroll.com",
    "tv.apple.com",
];
