use crate::block::{Block, BlockId};
use crate::range::{line_ranges, newline_offsets};
use crate::render::CursorVisualPosition;

use super::{CaretPosition, CursorDetails, CursorSegments, TextCursor};

/// Live text and caret of the focused block.
///
/// Typing edits the buffer only; the block in the store is updated when the
/// buffer is committed (blur, structural keys, quitting).
#[derive(Clone, Debug, Default)]
pub struct EditBuffer {
    block_id: Option<BlockId>,
    text: String,
    committed: String,
    caret: usize,
    preferred_column: Option<usize>,
    layout: Vec<(CaretPosition, CursorVisualPosition)>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_id(&self) -> Option<&BlockId> {
        self.block_id.as_ref()
    }

    pub fn is_focused(&self) -> bool {
        self.block_id.is_some()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    pub fn caret_position(&self) -> Option<CaretPosition> {
        let block_id = self.block_id.clone()?;
        Some(CaretPosition::new(block_id, self.caret))
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the live text differs from what was last loaded or committed.
    pub fn is_dirty(&self) -> bool {
        self.is_focused() && self.text != self.committed
    }

    pub fn mark_committed(&mut self) {
        self.committed = self.text.clone();
    }

    /// Drops focus and returns the block that was being edited.
    pub fn clear(&mut self) -> Option<BlockId> {
        self.text.clear();
        self.committed.clear();
        self.caret = 0;
        self.preferred_column = None;
        self.block_id.take()
    }

    /// Replaces the hit-test layout with the positions of the latest render.
    pub fn set_layout(&mut self, layout: Vec<(CaretPosition, CursorVisualPosition)>) {
        self.layout = layout;
    }

    pub fn layout(&self) -> &[(CaretPosition, CursorVisualPosition)] {
        &self.layout
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if !self.is_focused() {
            return false;
        }
        let byte_idx = char_to_byte_idx(&self.text, self.caret);
        self.text.insert(byte_idx, ch);
        self.caret += 1;
        self.preferred_column = None;
        true
    }

    /// Soft line break inside the block.
    pub fn insert_newline(&mut self) -> bool {
        self.insert_char('\n')
    }

    pub fn delete_backward(&mut self) -> bool {
        if !self.is_focused() || self.caret == 0 {
            return false;
        }
        self.caret -= 1;
        self.preferred_column = None;
        remove_char_from_text(&mut self.text, self.caret)
    }

    pub fn delete_forward(&mut self) -> bool {
        if !self.is_focused() {
            return false;
        }
        self.preferred_column = None;
        remove_char_from_text(&mut self.text, self.caret)
    }

    pub fn delete_word_backward(&mut self) -> bool {
        if !self.is_focused() || self.caret == 0 {
            return false;
        }
        let start = previous_word_boundary(&self.text, self.caret);
        let from = char_to_byte_idx(&self.text, start);
        let to = char_to_byte_idx(&self.text, self.caret);
        self.text.drain(from..to);
        self.caret = start;
        self.preferred_column = None;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.caret == 0 {
            return false;
        }
        self.caret -= 1;
        self.preferred_column = None;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.caret >= self.char_len() {
            return false;
        }
        self.caret += 1;
        self.preferred_column = None;
        true
    }

    pub fn move_word_left(&mut self) -> bool {
        let target = previous_word_boundary(&self.text, self.caret);
        self.move_to(target)
    }

    pub fn move_word_right(&mut self) -> bool {
        let target = next_word_boundary(&self.text, self.caret);
        self.move_to(target)
    }

    pub fn move_line_start(&mut self) -> bool {
        let starts = self.line_starts();
        let line = self.line_index(&starts);
        self.move_to(starts[line])
    }

    pub fn move_line_end(&mut self) -> bool {
        let starts = self.line_starts();
        let line = self.line_index(&starts);
        let end = self.line_end(&starts, line);
        self.move_to(end)
    }

    /// Moves to the previous logical line, keeping the column where possible.
    /// `false` on the first line.
    pub fn move_up(&mut self) -> bool {
        let starts = self.line_starts();
        let line = self.line_index(&starts);
        if line == 0 {
            return false;
        }
        self.move_to_line(&starts, line, line - 1);
        true
    }

    /// Moves to the next logical line. `false` on the last line.
    pub fn move_down(&mut self) -> bool {
        let starts = self.line_starts();
        let line = self.line_index(&starts);
        if line + 1 >= starts.len() {
            return false;
        }
        self.move_to_line(&starts, line, line + 1);
        true
    }

    fn move_to(&mut self, target: usize) -> bool {
        let target = target.min(self.char_len());
        self.preferred_column = None;
        if target == self.caret {
            return false;
        }
        self.caret = target;
        true
    }

    fn move_to_line(&mut self, starts: &[usize], from: usize, to: usize) {
        let column = self
            .preferred_column
            .unwrap_or(self.caret - starts[from]);
        let end = self.line_end(starts, to);
        self.caret = (starts[to] + column).min(end);
        self.preferred_column = Some(column);
    }

    /// Offsets where each logical line begins, including an empty line after
    /// a trailing newline.
    fn line_starts(&self) -> Vec<usize> {
        let mut starts = vec![0];
        starts.extend(newline_offsets(&self.text).into_iter().map(|idx| idx + 1));
        starts
    }

    fn line_index(&self, starts: &[usize]) -> usize {
        starts
            .iter()
            .rposition(|&start| start <= self.caret)
            .unwrap_or(0)
    }

    fn line_end(&self, starts: &[usize], line: usize) -> usize {
        starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or_else(|| self.char_len())
    }

    fn closest_position_on_line(&self, line: usize, column: u16) -> Option<&CaretPosition> {
        self.layout
            .iter()
            .filter(|(_, visual)| visual.line == line)
            .min_by_key(|(_, visual)| visual.column.abs_diff(column))
            .map(|(position, _)| position)
    }
}

impl TextCursor for EditBuffer {
    fn text_segments(&self) -> CursorSegments {
        let byte_idx = char_to_byte_idx(&self.text, self.caret);
        CursorSegments {
            before: self.text[..byte_idx].to_string(),
            after: self.text[byte_idx..].to_string(),
            offset: self.caret,
        }
    }

    fn is_on_last_line(&self, content: &str) -> bool {
        if content.is_empty() {
            return true;
        }
        line_ranges(content)
            .last_range()
            .is_some_and(|range| range.contains_inclusive(self.caret))
    }

    fn is_on_first_line(&self) -> bool {
        newline_offsets(&self.text)
            .into_iter()
            .all(|newline| self.caret <= newline)
    }

    fn is_at_block_start(&self) -> bool {
        self.caret == 0
    }

    fn position_details(&self) -> Option<CursorDetails> {
        self.block_id.as_ref()?;
        Some(CursorDetails {
            whole_text: self.text.clone(),
            newline_offsets: newline_offsets(&self.text),
            cursor_offset: self.caret,
        })
    }

    fn set_cursor(&mut self, block: &Block, offset: usize) {
        // Moving within the focused block keeps the uncommitted text.
        if self.block_id.as_ref() != Some(block.id()) {
            self.block_id = Some(block.id().clone());
            self.text = block.content().to_string();
            self.committed = self.text.clone();
        }
        self.caret = offset.min(self.char_len());
        self.preferred_column = None;
    }

    fn hit_test_point(&self, column: u16, line: usize) -> Option<CaretPosition> {
        if let Some(hit) = self.closest_position_on_line(line, column) {
            return Some(hit.clone());
        }
        let max_line = self
            .layout
            .iter()
            .map(|(_, visual)| visual.line)
            .max()?;
        let mut distance = 1usize;
        while line.checked_sub(distance).is_some() || line + distance <= max_line {
            if let Some(prev) = line.checked_sub(distance)
                && let Some(hit) = self.closest_position_on_line(prev, column)
            {
                return Some(hit.clone());
            }
            if let Some(hit) = self.closest_position_on_line(line + distance, column) {
                return Some(hit.clone());
            }
            distance += 1;
        }
        None
    }

    fn live_text(&self) -> String {
        self.text.clone()
    }
}

fn remove_char_from_text(text: &mut String, offset: usize) -> bool {
    let char_len = text.chars().count();
    if offset >= char_len {
        return false;
    }
    let start = char_to_byte_idx(text, offset);
    let end = char_to_byte_idx(text, offset + 1);
    if start >= end || end > text.len() {
        return false;
    }
    text.drain(start..end);
    true
}

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    text.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(text.len())
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

pub fn previous_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut idx = offset.min(chars.len());

    while idx > 0 && chars[idx - 1].is_whitespace() {
        idx -= 1;
    }
    if idx > 0 && is_word_char(chars[idx - 1]) {
        while idx > 0 && is_word_char(chars[idx - 1]) {
            idx -= 1;
        }
    } else {
        while idx > 0 && !is_word_char(chars[idx - 1]) && !chars[idx - 1].is_whitespace() {
            idx -= 1;
        }
    }
    idx
}

pub fn next_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut idx = offset.min(len);

    if idx < len && is_word_char(chars[idx]) {
        while idx < len && is_word_char(chars[idx]) {
            idx += 1;
        }
    } else {
        while idx < len && !chars[idx].is_whitespace() && !is_word_char(chars[idx]) {
            idx += 1;
        }
    }
    while idx < len && chars[idx].is_whitespace() {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn focused(text: &str, offset: usize) -> EditBuffer {
        let mut buffer = EditBuffer::new();
        buffer.set_cursor(&Block::new(text), offset);
        buffer
    }

    #[test]
    fn set_cursor_clamps_offset() {
        let buffer = focused("abc", 10);
        assert_eq!(buffer.caret(), 3);
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn set_cursor_on_same_block_keeps_live_text() {
        let block = Block::new("abc");
        let mut buffer = EditBuffer::new();
        buffer.set_cursor(&block, 3);
        buffer.insert_char('d');
        buffer.set_cursor(&block, 0);
        assert_eq!(buffer.text(), "abcd");
        assert_eq!(buffer.caret(), 0);
        assert!(buffer.is_dirty());
    }

    #[test]
    fn inserting_and_deleting_counts_chars() {
        let mut buffer = focused("äb", 1);
        assert!(buffer.insert_char('ö'));
        assert_eq!(buffer.text(), "äöb");
        assert!(buffer.delete_backward());
        assert!(buffer.delete_backward());
        assert_eq!(buffer.text(), "b");
        assert!(!buffer.delete_backward());
        assert!(buffer.delete_forward());
        assert!(!buffer.delete_forward());
        assert_eq!(buffer.text(), "");
    }

    #[test]
    fn unfocused_buffer_ignores_edits() {
        let mut buffer = EditBuffer::new();
        assert!(!buffer.insert_char('x'));
        assert!(buffer.position_details().is_none());
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn text_segments_split_at_caret() {
        let buffer = focused("hello", 2);
        assert_eq!(
            buffer.text_segments(),
            CursorSegments {
                before: "he".to_string(),
                after: "llo".to_string(),
                offset: 2,
            }
        );
    }

    #[test]
    fn first_and_last_line_detection() {
        let buffer = focused("abc\ndef", 3);
        assert!(buffer.is_on_first_line());
        assert!(!buffer.is_on_last_line("abc\ndef"));

        let buffer = focused("abc\ndef", 4);
        assert!(!buffer.is_on_first_line());
        assert!(buffer.is_on_last_line("abc\ndef"));

        let buffer = focused("abc\ndef", 1);
        assert!(!buffer.is_on_last_line("abc\ndef"));
        assert!(buffer.is_on_last_line(""));
    }

    #[test]
    fn caret_after_trailing_newline_is_not_on_last_range() {
        let buffer = focused("abc\n", 4);
        assert!(!buffer.is_on_last_line("abc\n"));
    }

    #[test]
    fn vertical_moves_keep_column() {
        let mut buffer = focused("abcdef\nxy\nlonger", 5);
        assert!(buffer.move_down());
        assert_eq!(buffer.caret(), 9);
        assert!(buffer.move_down());
        assert_eq!(buffer.caret(), 15);
        assert!(!buffer.move_down());
        assert!(buffer.move_up());
        assert!(buffer.move_up());
        assert_eq!(buffer.caret(), 5);
        assert!(!buffer.move_up());
    }

    #[test]
    fn line_start_and_end() {
        let mut buffer = focused("abc\ndef", 5);
        assert!(buffer.move_line_start());
        assert_eq!(buffer.caret(), 4);
        assert!(buffer.move_line_end());
        assert_eq!(buffer.caret(), 7);
    }

    #[test]
    fn word_movement_and_deletion() {
        let mut buffer = focused("foo bar baz", 11);
        assert!(buffer.move_word_left());
        assert_eq!(buffer.caret(), 8);
        assert!(buffer.delete_word_backward());
        assert_eq!(buffer.text(), "foo baz");
        assert!(buffer.move_word_right());
        assert_eq!(buffer.caret(), 7);
    }

    #[test]
    fn hit_test_prefers_closest_column_on_line() {
        let mut buffer = EditBuffer::new();
        let id = BlockId::from("a");
        buffer.set_layout(vec![
            (
                CaretPosition::new(id.clone(), 0),
                CursorVisualPosition { line: 0, column: 2 },
            ),
            (
                CaretPosition::new(id.clone(), 1),
                CursorVisualPosition { line: 0, column: 3 },
            ),
            (
                CaretPosition::new(id.clone(), 2),
                CursorVisualPosition { line: 2, column: 2 },
            ),
        ]);
        assert_eq!(buffer.hit_test_point(9, 0), Some(CaretPosition::new(id.clone(), 1)));
        assert_eq!(buffer.hit_test_point(0, 0), Some(CaretPosition::new(id.clone(), 0)));
        assert_eq!(buffer.hit_test_point(2, 3), Some(CaretPosition::new(id, 2)));
        assert_eq!(EditBuffer::new().hit_test_point(0, 0), None);
    }
}
