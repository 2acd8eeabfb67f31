//! Attribute-list tokenizer for HLS tags.
//!
//! `#EXT-X-STREAM-INF:BANDWIDTH=1280000,CODECS="avc1.4d401f,mp4a.40.2"` carries
//! commas inside quoted values, so the list is split on commas *outside*
//! quotes, then each token on its first `=`.

/// Parsed `NAME=value` pairs of one tag, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList {
    pairs: Vec<(String, String)>,
}

impl AttributeList {
    /// Tokenize the text after the tag's `:`.
    ///
    /// Tokens without `=` are ignored. Surrounding whitespace is trimmed from
    /// names and values. An unterminated quote swallows the rest of the line.
    pub fn parse(input: &str) -> Self {
        let mut pairs = Vec::new();
        let mut in_quotes = false;
        let mut start = 0;

        for (idx, ch) in input.char_indices() {
            match ch {
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => {
                    push_pair(&mut pairs, &input[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            }
        }
        push_pair(&mut pairs, &input[start..]);

        Self { pairs }
    }

    /// Parse the attributes of a full tag line such as `#EXT-X-KEY:METHOD=NONE`.
    pub fn from_tag_line(line: &str) -> Self {
        match line.split_once(':') {
            Some((_, attrs)) => Self::parse(attrs),
            None => Self::default(),
        }
    }

    /// Value of `name` (case-insensitive), with surrounding quotes removed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| unquote(value))
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// `RESOLUTION=1920x1080` as `(width, height)`
    pub fn get_resolution(&self, name: &str) -> Option<(u32, u32)> {
        let (w, h) = self.get(name)?.split_once(['x', 'X'])?;
        Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn push_pair(pairs: &mut Vec<(String, String)>, token: &str) {
    if let Some((key, value)) = token.split_once('=') {
        let key = key.trim();
        if !key.is_empty() {
            pairs.push((key.to_string(), value.trim().to_string()));
        }
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .map(|v| v.strip_suffix('"').unwrap_or(v))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_commas_outside_quotes() {
        let attrs = AttributeList::parse(
            r#"BANDWIDTH=1280000,CODECS="avc1.4d401f,mp4a.40.2",RESOLUTION=1280x720"#,
        );
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(1_280_000));
        assert_eq!(attrs.get("CODECS"), Some("avc1.4d401f,mp4a.40.2"));
        assert_eq!(attrs.get_resolution("RESOLUTION"), Some((1280, 720)));
    }

    #[test]
    fn splits_on_first_equals_only() {
        let attrs = AttributeList::parse(r#"METHOD=AES-128,URI="https://k.example.com/key?id=1&t=2""#);
        assert_eq!(attrs.get("METHOD"), Some("AES-128"));
        assert_eq!(attrs.get("URI"), Some("https://k.example.com/key?id=1&t=2"));
    }

    #[test]
    fn names_are_case_insensitive() {
        let attrs = AttributeList::parse("method=NONE");
        assert_eq!(attrs.get("METHOD"), Some("NONE"));
    }

    #[test]
    fn ignores_tokens_without_equals_and_whitespace() {
        let attrs = AttributeList::parse(" BANDWIDTH = 500 , garbage ,, FRAME-RATE=29.970");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.get_u64("BANDWIDTH"), Some(500));
        assert_eq!(attrs.get_f64("FRAME-RATE"), Some(29.97));
    }

    #[test]
    fn invalid_numbers_are_absent() {
        let attrs = AttributeList::parse("BANDWIDTH=abc,RESOLUTION=wide,FRAME-RATE=NaN");
        assert_eq!(attrs.get_u64("BANDWIDTH"), None);
        assert_eq!(attrs.get_resolution("RESOLUTION"), None);
        assert_eq!(attrs.get_f64("FRAME-RATE"), None);
    }

    #[test]
    fn from_tag_line_handles_missing_colon() {
        assert!(AttributeList::from_tag_line("#EXT-X-STREAM-INF").is_empty());
        let attrs = AttributeList::from_tag_line("#EXT-X-KEY:METHOD=SAMPLE-AES");
        assert_eq!(attrs.get("METHOD"), Some("SAMPLE-AES"));
    }

    #[test]
    fn unterminated_quote_takes_rest_of_line() {
        let attrs = AttributeList::parse(r#"CODECS="avc1,mp4a,BANDWIDTH=1"#);
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get("CODECS"), Some("avc1,mp4a,BANDWIDTH=1"));
    }
}
