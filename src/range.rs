//! Newline-delimited index ranges within a block's content.
//!
//! Offsets are counted in `char`s, the same unit the caret uses.
//!
//! ```text
//! content = "abc\ndef"
//!
//! |a|b|c|\n|
//! 0 1 2 3  4
//!
//! |d|e|f|
//! 4 5 6 7
//! ```

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Both bounds are inclusive, so adjacent lines share the newline offset.
    pub fn contains_inclusive(&self, x: usize) -> bool {
        self.start <= x && x <= self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Places `column` on this line, clamped to the line's bounds.
    pub fn offset_for_column(&self, column: usize) -> usize {
        self.start.saturating_add(column).clamp(self.start, self.end)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeList {
    ranges: Vec<IndexRange>,
}

impl RangeList {
    pub fn ranges(&self) -> &[IndexRange] {
        &self.ranges
    }

    pub fn first_range(&self) -> Option<IndexRange> {
        self.ranges.first().copied()
    }

    pub fn last_range(&self) -> Option<IndexRange> {
        self.ranges.last().copied()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    fn push_range(&mut self, start: usize, end: usize) {
        self.ranges.push(IndexRange::new(start, end));
    }
}

/// Splits `content` into one range per newline-delimited line.
///
/// A trailing newline does not produce an empty final range; `""` yields no
/// ranges at all.
pub fn line_ranges(content: &str) -> RangeList {
    let mut list = RangeList::default();
    let mut start = 0;
    let mut len = 0;
    for (idx, ch) in content.chars().enumerate() {
        if ch == '\n' {
            list.push_range(start, idx);
            start = idx + 1;
        }
        len = idx + 1;
    }
    if start < len {
        list.push_range(start, len);
    }
    list
}

/// Char offsets of every newline in `content`.
pub fn newline_offsets(content: &str) -> Vec<usize> {
    content
        .chars()
        .enumerate()
        .filter_map(|(idx, ch)| (ch == '\n').then_some(idx))
        .collect()
}

/// Offset of `offset` relative to the start of its logical line.
pub fn column_of(content: &str, offset: usize) -> usize {
    let line_start = newline_offsets(content)
        .into_iter()
        .filter(|&newline| newline < offset)
        .last()
        .map(|newline| newline + 1)
        .unwrap_or(0);
    offset.saturating_sub(line_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substrings(content: &str) -> Vec<String> {
        let chars: Vec<char> = content.chars().collect();
        line_ranges(content)
            .ranges()
            .iter()
            .map(|range| chars[range.start..range.end].iter().collect())
            .collect()
    }

    #[test]
    fn contains_boundaries_inclusively() {
        let range = IndexRange::new(1, 3);
        assert!(range.contains_inclusive(1));
        assert!(range.contains_inclusive(3));
        assert!(!range.contains_inclusive(0));
        assert!(!range.contains_inclusive(4));
    }

    #[test]
    fn empty_content_has_no_ranges() {
        let ranges = line_ranges("");
        assert!(ranges.is_empty());
        assert_eq!(ranges.last_range(), None);
    }

    #[test]
    fn single_line_spans_whole_string() {
        assert_eq!(line_ranges("abc").ranges(), &[IndexRange::new(0, 3)]);
    }

    #[test]
    fn captures_segment_after_last_newline() {
        assert_eq!(
            line_ranges("abc\ndef").ranges(),
            &[IndexRange::new(0, 3), IndexRange::new(4, 7)]
        );
    }

    #[test]
    fn trailing_newline_does_not_emit_empty_range() {
        assert_eq!(line_ranges("abc\n").ranges(), &[IndexRange::new(0, 3)]);
    }

    #[test]
    fn consecutive_newlines_emit_empty_ranges_between() {
        assert_eq!(
            line_ranges("a\n\nb").ranges(),
            &[
                IndexRange::new(0, 1),
                IndexRange::new(2, 2),
                IndexRange::new(3, 4)
            ]
        );
    }

    #[test]
    fn adjacent_ranges_only_touch_at_newline() {
        for content in ["x", "ab\ncd\nef", "\nabc", "a\n\n\nb", "héllo\nwörld"] {
            let ranges = line_ranges(content);
            for pair in ranges.ranges().windows(2) {
                assert_eq!(pair[0].end + 1, pair[1].start, "content {content:?}");
            }
        }
    }

    #[test]
    fn rejoined_lines_reproduce_content() {
        for content in ["abc", "abc\ndef", "ab\ncd\nef", "\nabc", "a\n\nb", "héllo\nwörld"] {
            assert_eq!(substrings(content).join("\n"), content);
        }
    }

    #[test]
    fn offsets_are_counted_in_chars() {
        assert_eq!(
            line_ranges("äö\nü").ranges(),
            &[IndexRange::new(0, 2), IndexRange::new(3, 4)]
        );
    }

    #[test]
    fn offset_for_column_clamps_to_line() {
        let range = IndexRange::new(4, 7);
        assert_eq!(range.offset_for_column(0), 4);
        assert_eq!(range.offset_for_column(2), 6);
        assert_eq!(range.offset_for_column(10), 7);
    }

    #[test]
    fn column_is_relative_to_line_start() {
        assert_eq!(column_of("abc\ndef", 2), 2);
        assert_eq!(column_of("abc\ndef", 6), 2);
        assert_eq!(column_of("abc\ndef", 4), 0);
        assert_eq!(column_of("abc\ndef", 3), 3);
    }
}
