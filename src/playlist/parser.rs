//! Playlist text → [`PlaylistAnalysis`]

use tracing::debug;

use super::{AttributeList, PlaylistAnalysis, PlaylistKind, QualityVariant, tags};
use crate::errors::PlaylistError;
use crate::utils::url::UrlUtils;

/// Analyse playlist `content` fetched from `source_url`.
///
/// Classification rules:
/// - `Master` if any `#EXT-X-STREAM-INF` tag is present, otherwise `Media`
/// - live unless `#EXT-X-ENDLIST` appears anywhere
/// - encrypted if any `#EXT-X-KEY` / `#EXT-X-SESSION-KEY` declares a METHOD other than `NONE`
///
/// Variants whose URI is missing or cannot be resolved are dropped; the parse
/// itself only fails when the `#EXTM3U` marker is absent. `qualities` is never
/// empty: a media playlist (or a master with no usable variant) yields one
/// synthetic entry pointing at `source_url`.
pub fn parse_playlist(content: &str, source_url: &str) -> Result<PlaylistAnalysis, PlaylistError> {
    let source_url = source_url.trim();
    let lines: Vec<&str> = content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if !lines.iter().any(|line| line.starts_with(tags::MARKER)) {
        return Err(PlaylistError::MissingMarker);
    }

    let is_encrypted = lines.iter().any(|line| declares_encryption(line));
    let is_live = !lines.iter().any(|line| line.starts_with(tags::ENDLIST));
    let kind = if lines.iter().any(|line| line.starts_with(tags::STREAM_INF)) {
        PlaylistKind::Master
    } else {
        PlaylistKind::Media
    };

    let mut qualities = match kind {
        PlaylistKind::Master => master_variants(&lines, source_url),
        PlaylistKind::Media => Vec::new(),
    };
    if qualities.is_empty() {
        qualities.push(QualityVariant::synthetic(source_url));
    }

    let (target_duration, segment_count, duration_seconds) = match kind {
        PlaylistKind::Media => media_facts(&lines),
        PlaylistKind::Master => (None, None, None),
    };

    debug!(
        kind = ?kind,
        is_live,
        is_encrypted,
        qualities = qualities.len(),
        "Parsed playlist"
    );

    Ok(PlaylistAnalysis {
        kind,
        is_live,
        is_encrypted,
        base_url: UrlUtils::base_directory(source_url),
        qualities,
        target_duration,
        segment_count,
        duration_seconds,
    })
}

fn is_key_tag(line: &str) -> bool {
    [tags::KEY, tags::SESSION_KEY]
        .iter()
        .any(|tag| line.strip_prefix(tag).is_some_and(|rest| rest.starts_with(':')))
}

fn declares_encryption(line: &str) -> bool {
    if !is_key_tag(line) {
        return false;
    }
    AttributeList::from_tag_line(line)
        .get("METHOD")
        .is_some_and(|method| !method.trim().eq_ignore_ascii_case("NONE"))
}

/// Collect variants in encounter order, then stable-sort by descending bandwidth.
fn master_variants(lines: &[&str], source_url: &str) -> Vec<QualityVariant> {
    let mut variants = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if !line.starts_with(tags::STREAM_INF) {
            continue;
        }
        let attrs = AttributeList::from_tag_line(line);

        let Some(reference) = lines[idx + 1..].iter().find(|l| !l.starts_with('#')) else {
            debug!("Dropping variant without URI: {}", line);
            continue;
        };

        let url = match UrlUtils::try_resolve(source_url, reference) {
            Ok(url) => url,
            Err(e) => {
                debug!("Dropping variant '{}': {}", reference, e);
                continue;
            }
        };

        variants.push(QualityVariant {
            resolution: attrs
                .get_resolution("RESOLUTION")
                .map(|(w, h)| format!("{w}x{h}")),
            bandwidth: attrs.get_u64("BANDWIDTH").unwrap_or(0),
            url,
            codecs: attrs.get("CODECS").map(str::to_string),
            frame_rate: attrs.get_f64("FRAME-RATE"),
        });
    }

    variants.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
    variants
}

fn media_facts(lines: &[&str]) -> (Option<f64>, Option<usize>, Option<f64>) {
    let target_duration = lines.iter().find_map(|line| {
        line.strip_prefix(tags::TARGET_DURATION)
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|v| v.trim().parse::<f64>().ok())
    });

    let segment_count = lines.iter().filter(|line| !line.starts_with('#')).count();

    let durations: Vec<f64> = lines
        .iter()
        .filter_map(|line| line.strip_prefix(tags::INF)?.strip_prefix(':'))
        .filter_map(|rest| rest.split(',').next()?.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .collect();
    let duration_seconds = (!durations.is_empty()).then(|| durations.iter().sum());

    (target_duration, Some(segment_count), duration_seconds)
}
