//! HLS playlist analysis
//!
//! Pure functions only: no I/O happens in this module. The service layer
//! fetches playlist text and hands it here together with the address it was
//! fetched from, which is needed to make every reference absolute.
//!
//! - [`parse_playlist`] turns playlist text into a [`PlaylistAnalysis`]
//! - [`rewrite_playlist`] rewrites every relative reference in a playlist to an
//!   absolute URL, for the streaming proxy
//! - [`AttributeList`] tokenizes `NAME=value,NAME="quoted, value"` tag attributes

use serde::{Deserialize, Serialize};

pub mod attributes;
pub mod parser;
pub mod rewrite;

pub use attributes::AttributeList;
pub use parser::parse_playlist;
pub use rewrite::rewrite_playlist;

/// Tag prefixes recognised by the parser and the rewriter
pub mod tags {
    pub const MARKER: &str = "#EXTM3U";
    pub const STREAM_INF: &str = "#EXT-X-STREAM-INF";
    pub const KEY: &str = "#EXT-X-KEY";
    pub const SESSION_KEY: &str = "#EXT-X-SESSION-KEY";
    pub const ENDLIST: &str = "#EXT-X-ENDLIST";
    pub const TARGET_DURATION: &str = "#EXT-X-TARGETDURATION";
    pub const INF: &str = "#EXTINF";
}

/// Whether a playlist lists variant playlists or media segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    Master,
    Media,
}

/// One quality rendition of a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityVariant {
    /// `"<width>x<height>"` when the source declared one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    /// Bits per second; 0 when not declared
    pub bandwidth: u64,
    /// Always absolute
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codecs: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
}

impl QualityVariant {
    /// The single entry emitted for a media playlist: the playlist itself.
    pub fn synthetic(url: impl Into<String>) -> Self {
        Self {
            resolution: None,
            bandwidth: 0,
            url: url.into(),
            codecs: None,
            frame_rate: None,
        }
    }
}

/// Result of analysing one playlist.
///
/// Built fresh per request and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistAnalysis {
    pub kind: PlaylistKind,
    /// True unless `#EXT-X-ENDLIST` is present
    pub is_live: bool,
    /// True if any key tag declares a METHOD other than NONE
    pub is_encrypted: bool,
    /// Directory of the playlist URL, always ending in `/`
    pub base_url: String,
    /// Never empty; ordered by descending bandwidth
    pub qualities: Vec<QualityVariant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_count: Option<usize>,
    /// Sum of `#EXTINF` durations (media playlists only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
}

impl PlaylistAnalysis {
    /// Downloading is only offered for finished, unencrypted streams.
    pub fn is_downloadable(&self) -> bool {
        !self.is_live && !self.is_encrypted
    }
}
