use crate::block::{BlockId, EditError};
use crate::range::{column_of, line_ranges};
use crate::store::Store;

use super::{CaretPosition, Key, KeyInput, KeyOutcome, TextCursor};

type KeyResult = Result<KeyOutcome, EditError>;

pub(super) fn dispatch(
    input: &KeyInput,
    block_id: &BlockId,
    store: &mut Store,
    cursor: &dyn TextCursor,
) -> KeyOutcome {
    if store.find_block_by_id(block_id).is_none() {
        log::warn!("key press on missing block {block_id}");
        store.set_caret_position(None);
        return KeyOutcome::ignored();
    }

    let mut keydown = Keydown {
        block_id,
        store,
        cursor,
    };
    let result = match input.key {
        Key::Enter if !input.shift => keydown.enter(),
        Key::Tab => keydown.tab(input.shift),
        Key::Down if !input.alt => keydown.arrow_down(),
        Key::Up if !input.alt => keydown.arrow_up(),
        Key::Left if !input.alt => keydown.arrow_left(),
        Key::Right if !input.alt => keydown.arrow_right(),
        Key::Char('a') if input.ctrl => Ok(keydown.line_start()),
        Key::Char('e') if input.ctrl => Ok(keydown.line_end()),
        Key::Backspace => keydown.backspace(),
        _ => Ok(KeyOutcome::ignored()),
    };

    result.unwrap_or_else(|err| {
        if err.is_precondition() {
            log::debug!("{:?} on {block_id} did nothing: {err}", input.key);
        } else {
            log::error!("{:?} on {block_id} aborted: {err}", input.key);
        }
        KeyOutcome::prevented()
    })
}

struct Keydown<'a> {
    block_id: &'a BlockId,
    store: &'a mut Store,
    cursor: &'a dyn TextCursor,
}

impl Keydown<'_> {
    /// Writes the live text into the block.
    fn commit(&mut self) -> Result<(), EditError> {
        let text = self.cursor.live_text();
        self.store.update_content(self.block_id, &text)
    }

    fn here(&self, offset: usize) -> CaretPosition {
        CaretPosition::new(self.block_id.clone(), offset)
    }

    /// Pre-order successor, as `(id, content)`.
    fn next_block(&self) -> Option<(BlockId, String)> {
        let next = self.store.root().next_block(self.block_id)?;
        Some((next.id().clone(), next.content().to_string()))
    }

    /// Pre-order predecessor, as `(id, content)`. The invisible root never
    /// qualifies.
    fn prev_block(&self) -> Option<(BlockId, String)> {
        let root = self.store.root();
        let prev = root.prev_block(self.block_id)?;
        if root.is_root_id(prev.id()) {
            return None;
        }
        Some((prev.id().clone(), prev.content().to_string()))
    }

    fn enter(&mut self) -> KeyResult {
        let segments = self.cursor.text_segments();
        let new_block =
            self.store
                .split_block_at_caret(self.block_id, &segments.before, &segments.after)?;
        Ok(KeyOutcome::moved(CaretPosition::new(new_block, 0)))
    }

    fn tab(&mut self, outdent: bool) -> KeyResult {
        self.commit()?;
        if outdent {
            self.store.outdent(self.block_id)?;
        } else {
            self.store.indent(self.block_id)?;
        }
        let offset = self.cursor.text_segments().offset;
        Ok(KeyOutcome::moved(self.here(offset)))
    }

    /// Leaves the block downwards from its last line, keeping the column.
    fn arrow_down(&mut self) -> KeyResult {
        let text = self.cursor.live_text();
        if !self.cursor.is_on_last_line(&text) {
            return Ok(KeyOutcome::ignored());
        }
        let Some((next_id, next_content)) = self.next_block() else {
            return Ok(KeyOutcome::prevented());
        };
        self.commit()?;

        let column = column_of(&text, self.cursor.text_segments().offset);
        let offset = line_ranges(&next_content)
            .first_range()
            .map(|range| range.offset_for_column(column))
            .unwrap_or(0);
        Ok(KeyOutcome::moved(CaretPosition::new(next_id, offset)))
    }

    /// Leaves the block upwards from its first line onto the last line of
    /// the previous block.
    fn arrow_up(&mut self) -> KeyResult {
        if !self.cursor.is_on_first_line() {
            return Ok(KeyOutcome::ignored());
        }
        let Some((prev_id, prev_content)) = self.prev_block() else {
            log::debug!("no block above {}", self.block_id);
            return Ok(KeyOutcome::prevented());
        };
        self.commit()?;

        let column = self.cursor.text_segments().offset;
        let offset = line_ranges(&prev_content)
            .last_range()
            .map(|range| range.offset_for_column(column))
            .unwrap_or(0);
        Ok(KeyOutcome::moved(CaretPosition::new(prev_id, offset)))
    }

    fn arrow_left(&mut self) -> KeyResult {
        if !self.cursor.is_at_block_start() {
            return Ok(KeyOutcome::ignored());
        }
        let Some((prev_id, prev_content)) = self.prev_block() else {
            return Ok(KeyOutcome::prevented());
        };
        self.commit()?;
        let offset = prev_content.chars().count();
        Ok(KeyOutcome::moved(CaretPosition::new(prev_id, offset)))
    }

    fn arrow_right(&mut self) -> KeyResult {
        let Some(details) = self.cursor.position_details() else {
            return Ok(KeyOutcome::ignored());
        };
        if details.cursor_offset != details.whole_text.chars().count() {
            return Ok(KeyOutcome::ignored());
        }
        let Some((next_id, _)) = self.next_block() else {
            return Ok(KeyOutcome::prevented());
        };
        self.commit()?;
        Ok(KeyOutcome::moved(CaretPosition::new(next_id, 0)))
    }

    /// Ctrl+A: just after the closest newline before the caret.
    fn line_start(&self) -> KeyOutcome {
        let offset = self
            .cursor
            .position_details()
            .and_then(|details| {
                details
                    .newline_offsets
                    .iter()
                    .rev()
                    .find(|&&newline| newline < details.cursor_offset)
                    .map(|newline| newline + 1)
            })
            .unwrap_or(0);
        KeyOutcome::moved(self.here(offset))
    }

    /// Ctrl+E: the closest newline at or after the caret, else the end.
    fn line_end(&self) -> KeyOutcome {
        let offset = match self.cursor.position_details() {
            Some(details) => details
                .newline_offsets
                .iter()
                .find(|&&newline| newline >= details.cursor_offset)
                .copied()
                .unwrap_or_else(|| details.whole_text.chars().count()),
            None => self.cursor.live_text().chars().count(),
        };
        KeyOutcome::moved(self.here(offset))
    }

    /// Backspace at the start of a childless block joins it onto the block
    /// above.
    fn backspace(&mut self) -> KeyResult {
        let has_children = self
            .store
            .find_block_by_id(self.block_id)
            .is_some_and(|block| block.has_children());
        if has_children || !self.cursor.is_at_block_start() {
            return Ok(KeyOutcome::ignored());
        }
        if self.prev_block().is_none() {
            return Ok(KeyOutcome::ignored());
        }
        self.commit()?;
        let caret = self.store.merge_into_previous(self.block_id)?;
        Ok(KeyOutcome::moved(caret))
    }
}
