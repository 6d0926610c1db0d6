//! Text matching over a partially highlighted document
//!
//! The document is kept as a flat run of segments. Plain segments are still
//! open for matching; marked segments were produced by an earlier change and
//! are never searched again, which is what keeps markers from nesting.

use super::markup::{wrap_into, MarkerKind, MARKER_ATTRIBUTE, MARKER_CLOSE};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^<>]*>").expect("markup tag pattern is valid"));

static MARKER_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?s)<span {MARKER_ATTRIBUTE}="([a-z]+)"[^>]*>(.*?){}"#,
        regex::escape(MARKER_CLOSE)
    ))
    .expect("marker span pattern is valid")
});

/// A run of document text, optionally inside a highlight marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub marker: Option<MarkerKind>,
}

/// Where a match was found: segment index plus byte offset inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub segment: usize,
    pub offset: usize,
}

/// Document text split into plain and highlighted segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedText {
    segments: Vec<Segment>,
}

impl SegmentedText {
    pub fn new(base_text: &str) -> Self {
        let segments = if base_text.is_empty() {
            vec![]
        } else {
            vec![Segment {
                text: base_text.to_string(),
                marker: None,
            }]
        };
        Self { segments }
    }

    /// Rebuild segments from markup produced by [`Self::to_markup`]
    pub fn from_markup(markup: &str) -> Self {
        fn push_plain(segments: &mut Vec<Segment>, text: &str) {
            if !text.is_empty() {
                segments.push(Segment {
                    text: text.to_string(),
                    marker: None,
                });
            }
        }

        let mut segments = Vec::new();
        let mut last = 0;
        for caps in MARKER_SPAN.captures_iter(markup) {
            let (Some(whole), Some(kind), Some(inner)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let Some(kind) = MarkerKind::from_name(kind.as_str()) else {
                continue;
            };
            push_plain(&mut segments, &markup[last..whole.start()]);
            segments.push(Segment {
                text: inner.as_str().to_string(),
                marker: Some(kind),
            });
            last = whole.end();
        }
        push_plain(&mut segments, &markup[last..]);

        Self { segments }
    }

    #[cfg(test)]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Current document text without marker markup
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    /// Find the leftmost occurrence of `needle` that lies entirely inside a
    /// plain segment, within `region` (byte range over [`Self::plain_text`]),
    /// and does not cut through a markup tag.
    pub fn find_unmarked(&self, needle: &str, region: &Range<usize>) -> Option<Location> {
        if needle.is_empty() {
            return None;
        }

        let mut start = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            let end = start + segment.text.len();
            if segment.marker.is_none() {
                let lo = region.start.max(start);
                let hi = region.end.min(end);
                if hi > lo && hi - lo >= needle.len() {
                    let window = (lo - start)..(hi - start);
                    if let Some(offset) = find_without_splitting_tags(&segment.text, needle, window)
                    {
                        return Some(Location {
                            segment: index,
                            offset,
                        });
                    }
                }
            }
            start = end;
        }
        None
    }

    /// Byte offset of `location` in [`Self::plain_text`]
    pub fn plain_offset(&self, location: Location) -> usize {
        let before: usize = self.segments[..location.segment]
            .iter()
            .map(|s| s.text.len())
            .sum();
        before + location.offset
    }

    /// Replace `len` bytes at `location` with `replacement` inside a marker
    pub fn mark(&mut self, location: Location, len: usize, replacement: &str, kind: MarkerKind) {
        let segment = &self.segments[location.segment];
        let (before, rest) = segment.text.split_at(location.offset);
        let (_, after) = rest.split_at(len);

        let mut pieces = Vec::with_capacity(3);
        if !before.is_empty() {
            pieces.push(Segment {
                text: before.to_string(),
                marker: None,
            });
        }
        pieces.push(Segment {
            text: replacement.to_string(),
            marker: Some(kind),
        });
        if !after.is_empty() {
            pieces.push(Segment {
                text: after.to_string(),
                marker: None,
            });
        }

        self.segments.splice(location.segment..=location.segment, pieces);
    }

    /// Serialize to markup, wrapping marked segments
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment.marker {
                Some(kind) => wrap_into(&mut out, kind, &segment.text),
                None => out.push_str(&segment.text),
            }
        }
        out
    }
}

/// Leftmost literal match of `needle` inside `window` of `text` whose
/// boundaries do not fall strictly inside a `<...>` tag
fn find_without_splitting_tags(text: &str, needle: &str, window: Range<usize>) -> Option<usize> {
    let tags: Vec<Range<usize>> = MARKUP_TAG.find_iter(text).map(|m| m.range()).collect();

    let mut from = window.start;
    while from < window.end {
        let haystack = text.get(from..window.end)?;
        let pos = from + haystack.find(needle)?;
        let end = pos + needle.len();
        if !splits_tag(&tags, pos, end) {
            return Some(pos);
        }
        // Retry one character further on; overlapping candidates are allowed.
        from = pos + text.get(pos..)?.chars().next().map_or(1, char::len_utf8);
    }
    None
}

fn splits_tag(tags: &[Range<usize>], start: usize, end: usize) -> bool {
    let inside = |pos: usize, tag: &Range<usize>| tag.start < pos && pos < tag.end;
    tags.iter().any(|tag| inside(start, tag) || inside(end, tag))
}
