use crate::block::Block;

use super::CaretPosition;

/// Text on either side of the caret inside the focused block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CursorSegments {
    pub before: String,
    pub after: String,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CursorDetails {
    pub whole_text: String,
    pub newline_offsets: Vec<usize>,
    pub cursor_offset: usize,
}

/// Access to the live caret and the text of the focused block.
///
/// The caret mapping code only ever talks to the terminal through this
/// trait, so it can be driven by a plain edit buffer in tests. Offsets are
/// char offsets into the live text.
pub trait TextCursor {
    fn text_segments(&self) -> CursorSegments;

    /// Whether the caret sits on the last newline-delimited line of
    /// `content`. Empty content counts as a single line.
    fn is_on_last_line(&self, content: &str) -> bool;

    /// Whether no newline precedes the caret.
    fn is_on_first_line(&self) -> bool;

    fn is_at_block_start(&self) -> bool;

    /// `None` when nothing is focused.
    fn position_details(&self) -> Option<CursorDetails>;

    /// Focuses `block` with the caret at `offset`, clamped to its text.
    fn set_cursor(&mut self, block: &Block, offset: usize);

    /// Maps a cell of the outline area (column, line counted from the top
    /// of the outline) to the nearest caret position.
    fn hit_test_point(&self, column: u16, line: usize) -> Option<CaretPosition>;

    /// The uncommitted text of the focused block.
    fn live_text(&self) -> String;
}
