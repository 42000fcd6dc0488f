use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

const INLINE_TOKEN: &str = r"`[^`]*`|\[[^\]]+\]\([^)]+\)";
const LINK_TOKEN: &str = r"^\[([^\]]+)\]\(([^)]+)\)$";

static INLINE_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
static LINK_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// A run of display text produced from a block's raw content.
///
/// Segments are recomputed on every render and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text { value: String },
    Code { value: String },
    Link { value: String, href: String },
}

impl Segment {
    pub fn text(value: impl Into<String>) -> Self {
        Segment::Text {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Segment::Text { value } | Segment::Code { value } | Segment::Link { value, .. } => {
                value
            }
        }
    }

    /// Number of chars this segment occupied in the raw content.
    pub fn source_len(&self) -> usize {
        match self {
            Segment::Text { value } => value.chars().count(),
            Segment::Code { value } => value.chars().count() + 2,
            Segment::Link { value, href } => value.chars().count() + href.chars().count() + 4,
        }
    }

    /// Char offset inside the raw token where the displayed value begins.
    pub fn value_source_offset(&self) -> usize {
        match self {
            Segment::Text { .. } => 0,
            Segment::Code { .. } | Segment::Link { .. } => 1,
        }
    }
}

/// `None` only if `pattern` fails to compile; callers then treat the
/// content as plain text.
fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::error!("invalid markdown token pattern {pattern:?}: {err}");
            None
        }
    })
    .as_ref()
}

fn inline_regex() -> Option<&'static Regex> {
    compiled(&INLINE_REGEX, INLINE_TOKEN)
}

fn link_regex() -> Option<&'static Regex> {
    compiled(&LINK_REGEX, LINK_TOKEN)
}

/// Very rough inline markdown parser: backtick code spans and `[label](href)`
/// links, everything else is plain text.
///
/// Always yields at least one segment; empty input gives a single empty text
/// segment.
pub fn parse_inline_markdown(raw: &str) -> Vec<Segment> {
    let Some(inline) = inline_regex() else {
        return vec![Segment::text(raw)];
    };
    let mut segments = Vec::new();
    let mut last_index = 0;

    for token in inline.find_iter(raw) {
        if token.start() > last_index {
            segments.push(Segment::text(&raw[last_index..token.start()]));
        }
        segments.push(parse_matched_token(token.as_str()));
        last_index = token.end();
    }

    if last_index < raw.len() {
        segments.push(Segment::text(&raw[last_index..]));
    }

    if segments.is_empty() {
        segments.push(Segment::text(raw));
    }

    segments
}

fn parse_matched_token(token: &str) -> Segment {
    if let Some(code) = token
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
    {
        return Segment::Code {
            value: code.to_string(),
        };
    }

    if let Some(captures) = link_regex().and_then(|regex| regex.captures(token)) {
        return Segment::Link {
            value: captures[1].to_string(),
            href: captures[2].to_string(),
        };
    }

    Segment::text(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_patterns_compile() {
        assert!(inline_regex().is_some());
        assert!(link_regex().is_some());
    }

    #[test]
    fn plain_text_is_single_segment() {
        assert_eq!(
            parse_inline_markdown("hello world"),
            vec![Segment::text("hello world")]
        );
    }

    #[test]
    fn empty_input_yields_empty_text_segment() {
        assert_eq!(parse_inline_markdown(""), vec![Segment::text("")]);
    }

    #[test]
    fn code_spans_are_split_out() {
        assert_eq!(
            parse_inline_markdown("run `cargo test` now"),
            vec![
                Segment::text("run "),
                Segment::Code {
                    value: "cargo test".to_string()
                },
                Segment::text(" now"),
            ]
        );
    }

    #[test]
    fn links_capture_label_and_href() {
        assert_eq!(
            parse_inline_markdown("see [docs](https://example.com)"),
            vec![
                Segment::text("see "),
                Segment::Link {
                    value: "docs".to_string(),
                    href: "https://example.com".to_string()
                },
            ]
        );
    }

    #[test]
    fn unterminated_tokens_stay_text() {
        assert_eq!(
            parse_inline_markdown("a `b and [c](d"),
            vec![Segment::text("a `b and [c](d")]
        );
    }

    #[test]
    fn empty_code_span_is_code() {
        assert_eq!(
            parse_inline_markdown("``"),
            vec![Segment::Code {
                value: String::new()
            }]
        );
    }

    #[test]
    fn source_lengths_cover_raw_content() {
        let raw = "a `b` [c](dd) é";
        let total: usize = parse_inline_markdown(raw)
            .iter()
            .map(Segment::source_len)
            .sum();
        assert_eq!(total, raw.chars().count());
    }

    #[test]
    fn segments_serialize_with_type_tag() {
        let json = serde_json::to_string(&Segment::Link {
            value: "x".to_string(),
            href: "y".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"link","value":"x","href":"y"}"#);
    }
}
