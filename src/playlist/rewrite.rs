//! Playlist rewriting for the streaming proxy.
//!
//! Players resolve relative references against the address they fetched the
//! playlist from, which for proxied playback is our own endpoint. Every
//! reference is therefore made absolute against the upstream playlist URL
//! before the text is handed back.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::utils::url::UrlUtils;

/// `URI="..."` attribute inside a tag line (`#EXT-X-KEY`, `#EXT-X-MAP`, `#EXT-X-MEDIA`...)
static URI_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([:,]\s*URI\s*=\s*")([^"]*)""#).expect("static regex is valid")
});

/// Rewrite every relative reference in `content` to an absolute URL resolved
/// against `playlist_url`.
///
/// Segment/variant lines and `URI="..."` attributes are rewritten; references
/// that already carry a scheme (`https:`, `data:`, `skd:`) are left alone. Blank
/// lines and tags without URIs pass through unchanged. The output always ends
/// with a newline.
pub fn rewrite_playlist(content: &str, playlist_url: &str) -> String {
    let content = content.trim_start_matches('\u{feff}');
    let mut rewritten = String::with_capacity(content.len() + content.len() / 2);

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() {
            rewritten.push('\n');
            continue;
        }

        if line.starts_with('#') {
            rewritten.push_str(&rewrite_tag_uris(line, playlist_url));
        } else {
            rewritten.push_str(&absolutize(line, playlist_url));
        }
        rewritten.push('\n');
    }

    rewritten
}

fn rewrite_tag_uris<'a>(line: &'a str, playlist_url: &str) -> Cow<'a, str> {
    URI_ATTRIBUTE.replace_all(line, |caps: &Captures| {
        format!("{}{}\"", &caps[1], absolutize(&caps[2], playlist_url))
    })
}

fn absolutize(reference: &str, playlist_url: &str) -> String {
    if reference.is_empty() || UrlUtils::has_scheme(reference) {
        return reference.to_string();
    }
    UrlUtils::resolve(playlist_url, reference)
}
