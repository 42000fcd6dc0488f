//! Caret mapping: turns key presses and clicks on the focused block into
//! outline edits plus a new caret position.
//!
//! Nothing here touches the terminal. The live caret and text are read
//! through [`TextCursor`], and the outcome tells the caller whether the key
//! was consumed or should fall through to plain text editing.

use crate::block::BlockId;
use crate::store::Store;

mod buffer;
mod keydown;
mod text_cursor;

pub use crate::store::CaretPosition;
pub use buffer::{EditBuffer, char_to_byte_idx, next_word_boundary, previous_word_boundary};
pub use text_cursor::{CursorDetails, CursorSegments, TextCursor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Escape,
    Char(char),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl KeyInput {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            shift: false,
            ctrl: false,
            alt: false,
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }
}

/// What a key press did.
///
/// `prevent_default` means the key was consumed and must not reach the
/// edit buffer. `caret` is the new caret position, if the caret moved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyOutcome {
    pub prevent_default: bool,
    pub caret: Option<CaretPosition>,
}

impl KeyOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn prevented() -> Self {
        Self {
            prevent_default: true,
            caret: None,
        }
    }

    pub fn moved(caret: CaretPosition) -> Self {
        Self {
            prevent_default: true,
            caret: Some(caret),
        }
    }
}

/// Handles a key press on `block_id`, the block being edited.
///
/// Structural edits go through `store`. When the caret moves, the store's
/// caret is updated first and `cursor` is repositioned afterwards, so the
/// cursor always sees the already edited outline.
pub fn handle_key(
    input: &KeyInput,
    block_id: &BlockId,
    store: &mut Store,
    cursor: &mut dyn TextCursor,
) -> KeyOutcome {
    let outcome = keydown::dispatch(input, block_id, store, cursor);
    if let Some(caret) = &outcome.caret {
        place_caret(store, cursor, caret.clone());
    }
    outcome
}

/// Focuses whatever lies under the clicked cell.
pub fn handle_click(
    column: u16,
    line: usize,
    store: &mut Store,
    cursor: &mut dyn TextCursor,
) -> Option<CaretPosition> {
    let caret = cursor.hit_test_point(column, line)?;
    place_caret(store, cursor, caret);
    store.caret_position().cloned()
}

fn place_caret(store: &mut Store, cursor: &mut dyn TextCursor, caret: CaretPosition) {
    store.set_caret_position(Some(caret));
    let Some(caret) = store.caret_position() else {
        return;
    };
    if let Some(block) = store.find_block_by_id(&caret.block_id) {
        cursor.set_cursor(block, caret.offset);
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
