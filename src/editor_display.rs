use ratatui::layout::Rect;

use crate::block::BlockId;
use crate::editor::{self, CaretPosition, EditBuffer, Key, KeyInput, TextCursor};
use crate::render::{CursorVisualPosition, FocusedBlock, RenderResult, render_outline};
use crate::store::{self, Store};
use crate::theme::Theme;

/// Whether a block is being edited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Focus {
    Unfocused,
    Editing(BlockId),
}

/// EditorDisplay owns the store and the edit buffer and manages all
/// visual concerns: focus, rendering, clicks and plain text editing.
pub struct EditorDisplay {
    store: Store,
    buffer: EditBuffer,
    theme: Theme,
    last_cursor_visual: Option<CursorVisualPosition>,
    cursor_following: bool,
    last_view_height: usize,
    last_total_lines: usize,
    last_text_area: Rect,
}

impl EditorDisplay {
    pub fn new(store: Store, theme: Theme) -> Self {
        Self {
            store,
            buffer: EditBuffer::new(),
            theme,
            last_cursor_visual: None,
            cursor_following: true,
            last_view_height: 1,
            last_total_lines: 0,
            last_text_area: Rect::default(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn focus(&self) -> Focus {
        match self.buffer.block_id() {
            Some(id) => Focus::Editing(id.clone()),
            None => Focus::Unfocused,
        }
    }

    /// Whether there are edits that are neither committed nor persisted.
    pub fn has_unsaved_changes(&self) -> bool {
        self.buffer.is_dirty() || self.store.is_dirty()
    }

    /// Get the last cursor visual position
    pub fn last_cursor_visual(&self) -> Option<CursorVisualPosition> {
        self.last_cursor_visual
    }

    /// Check if cursor following is enabled
    pub fn cursor_following(&self) -> bool {
        self.cursor_following
    }

    /// Detach cursor follow, e.g. while scrolling with the mouse
    pub fn detach_cursor_follow(&mut self) {
        self.cursor_following = false;
    }

    /// Get last view height
    pub fn last_view_height(&self) -> usize {
        self.last_view_height
    }

    /// Get last total lines
    pub fn last_total_lines(&self) -> usize {
        self.last_total_lines
    }

    /// Writes the live text into the focused block without leaving it.
    pub fn commit(&mut self) {
        let Some(id) = self.buffer.block_id().cloned() else {
            return;
        };
        if !self.buffer.is_dirty() {
            return;
        }
        match self.store.update_content(&id, self.buffer.text()) {
            Ok(()) => self.buffer.mark_committed(),
            Err(err) => {
                log::warn!("dropping edits of vanished block {id}: {err}");
                self.buffer.clear();
                self.store.set_caret_position(None);
            }
        }
    }

    /// Leaves the focused block, committing its text first.
    pub fn blur(&mut self) {
        self.commit();
        self.buffer.clear();
        self.store.set_caret_position(None);
    }

    /// Starts editing at `caret`. Switching blocks commits the old one.
    pub fn focus_caret(&mut self, caret: CaretPosition) {
        if self.buffer.block_id() != Some(&caret.block_id) {
            self.commit();
        }
        self.store.set_caret_position(Some(caret));
        self.sync_buffer_with_store();
    }

    /// Repositions the buffer on the store's caret, or drops focus when the
    /// caret is gone.
    fn sync_buffer_with_store(&mut self) {
        let Some(caret) = self.store.caret_position() else {
            self.buffer.clear();
            return;
        };
        match self.store.find_block_by_id(&caret.block_id) {
            Some(block) => self.buffer.set_cursor(block, caret.offset),
            None => {
                self.buffer.clear();
            }
        }
        self.cursor_following = true;
    }

    /// Structural keys commit the live text through the store.
    fn sync_committed(&mut self) {
        let Some(id) = self.buffer.block_id() else {
            return;
        };
        let committed = self
            .store
            .find_block_by_id(id)
            .is_some_and(|block| block.content() == self.buffer.text());
        if committed {
            self.buffer.mark_committed();
        }
    }

    /// Handles a key press. Returns `true` if anything changed.
    pub fn handle_key(&mut self, input: KeyInput) -> bool {
        let Some(block_id) = self.buffer.block_id().cloned() else {
            return self.handle_unfocused_key(input);
        };
        if input.key == Key::Escape {
            self.blur();
            return true;
        }

        let outcome = editor::handle_key(&input, &block_id, &mut self.store, &mut self.buffer);
        if outcome.prevent_default {
            if self.store.caret_position().is_none() {
                self.buffer.clear();
            }
            self.sync_committed();
            self.cursor_following = true;
            return true;
        }
        if self.store.caret_position().is_none() {
            // The block vanished underneath the buffer.
            self.buffer.clear();
            return true;
        }

        let changed = self.apply_native_key(input);
        if changed {
            self.store.set_caret_position(self.buffer.caret_position());
            self.cursor_following = true;
        }
        changed
    }

    /// With nothing focused, navigation keys pick up the last caret or the
    /// first block.
    fn handle_unfocused_key(&mut self, input: KeyInput) -> bool {
        if !matches!(
            input.key,
            Key::Enter | Key::Up | Key::Down | Key::Left | Key::Right | Key::Home | Key::End
        ) {
            return false;
        }
        let caret = self.store.caret_position().cloned().or_else(|| {
            self.store
                .root()
                .first_child()
                .map(|first| CaretPosition::new(first.id().clone(), 0))
        });
        match caret {
            Some(caret) => {
                self.focus_caret(caret);
                true
            }
            None => false,
        }
    }

    /// Editing the browser would have done natively.
    fn apply_native_key(&mut self, input: KeyInput) -> bool {
        let buffer = &mut self.buffer;
        match (input.key, input.ctrl, input.alt) {
            (Key::Enter, _, _) if input.shift => buffer.insert_newline(),
            (Key::Char('j'), true, _) => buffer.insert_newline(),
            (Key::Char('w'), true, _) => buffer.delete_word_backward(),
            (Key::Char(ch), false, false) => buffer.insert_char(ch),
            (Key::Backspace, true, _) | (Key::Backspace, _, true) => buffer.delete_word_backward(),
            (Key::Backspace, _, _) => buffer.delete_backward(),
            (Key::Delete, _, _) => buffer.delete_forward(),
            (Key::Left, _, true) => buffer.move_word_left(),
            (Key::Right, _, true) => buffer.move_word_right(),
            (Key::Left, _, _) => buffer.move_left(),
            (Key::Right, _, _) => buffer.move_right(),
            (Key::Up, _, _) => buffer.move_up(),
            (Key::Down, _, _) => buffer.move_down(),
            (Key::Home, _, _) => buffer.move_line_start(),
            (Key::End, _, _) => buffer.move_line_end(),
            _ => false,
        }
    }

    /// Convert mouse coordinates to an outline position and focus it.
    pub fn handle_click(&mut self, column: u16, row: u16, scroll_top: usize) -> bool {
        let area = self.last_text_area;
        if area.width == 0 || area.height == 0 {
            return false;
        }
        let max_x = area.x.saturating_add(area.width);
        let max_y = area.y.saturating_add(area.height);
        if column < area.x || column >= max_x || row < area.y || row >= max_y {
            return false;
        }
        let line = scroll_top.saturating_add((row - area.y) as usize);
        let relative_column = column.saturating_sub(area.x);

        let Some(hit) = self.buffer.hit_test_point(relative_column, line) else {
            return false;
        };
        if self.buffer.block_id() != Some(&hit.block_id) {
            self.commit();
        }
        let placed = editor::handle_click(relative_column, line, &mut self.store, &mut self.buffer);
        if placed.is_none() {
            self.buffer.clear();
        }
        self.cursor_following = true;
        true
    }

    /// Render the outline at the given width and update internal state
    pub fn render_outline(&mut self, wrap_width: usize) -> RenderResult {
        let focus = self.buffer.block_id().map(|block_id| FocusedBlock {
            block_id,
            text: self.buffer.text(),
            caret: self.buffer.caret(),
        });
        let result = render_outline(self.store.root(), wrap_width, focus, &self.theme);
        self.buffer.set_layout(result.cursor_map.clone());
        self.last_cursor_visual = result.cursor;
        result
    }

    /// Update tracking state after rendering (called from draw)
    pub fn update_after_render(&mut self, text_area: Rect, total_lines: usize) {
        self.last_text_area = text_area;
        self.last_total_lines = total_lines;
        self.last_view_height = (text_area.height as usize).max(1);
    }

    /// Pretty JSON of the committed outline.
    pub fn outline_json(&self) -> store::Result<String> {
        self.store.to_json_pretty()
    }

    /// Commits and writes the outline to storage.
    pub fn persist(&mut self) -> store::Result<()> {
        self.commit();
        self.store.persist()
    }

    /// Drops focus and uncommitted text, then restores the default outline.
    pub fn reset(&mut self) -> store::Result<()> {
        self.buffer.clear();
        self.last_cursor_visual = None;
        self.store.reset_to_initial()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::block::Block;

    fn leaf(id: &str, content: &str) -> Block {
        Block::from_parts(BlockId::from(id), content, Vec::new())
    }

    fn create_test_display() -> EditorDisplay {
        let root = Block::from_parts(
            BlockId::from("root"),
            "",
            vec![
                Rc::new(leaf("a", "First block")),
                Rc::new(leaf("b", "Second block with more content")),
                Rc::new(leaf("c", "Third")),
            ],
        );
        EditorDisplay::new(Store::in_memory(root), Theme::default())
    }

    fn type_text(display: &mut EditorDisplay, text: &str) {
        for ch in text.chars() {
            assert!(display.handle_key(KeyInput::new(Key::Char(ch))));
        }
    }

    fn content(display: &EditorDisplay, id: &str) -> String {
        display
            .store()
            .find_block_by_id(&BlockId::from(id))
            .map(|block| block.content().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn starts_unfocused() {
        let display = create_test_display();
        assert_eq!(display.focus(), Focus::Unfocused);
        assert!(!display.has_unsaved_changes());
    }

    #[test]
    fn navigation_key_focuses_first_block() {
        let mut display = create_test_display();
        assert!(display.handle_key(KeyInput::new(Key::Down)));
        assert_eq!(display.focus(), Focus::Editing(BlockId::from("a")));
        assert_eq!(display.buffer().caret(), 0);
    }

    #[test]
    fn typing_stays_in_buffer_until_blur() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("c"), 5));
        type_text(&mut display, "!!");

        assert_eq!(content(&display, "c"), "Third");
        assert!(display.has_unsaved_changes());

        assert!(display.handle_key(KeyInput::new(Key::Escape)));
        assert_eq!(display.focus(), Focus::Unfocused);
        assert_eq!(content(&display, "c"), "Third!!");
        assert_eq!(display.store().caret_position(), None);
    }

    #[test]
    fn shift_enter_inserts_soft_line_break() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("c"), 5));
        assert!(display.handle_key(KeyInput::new(Key::Enter).with_shift()));
        type_text(&mut display, "x");
        display.blur();
        assert_eq!(content(&display, "c"), "Third\nx");
        assert_eq!(display.store().root().block_count(), 4);
    }

    #[test]
    fn enter_splits_through_the_protocol() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("a"), 5));
        assert!(display.handle_key(KeyInput::new(Key::Enter)));
        assert_eq!(display.store().root().block_count(), 5);
        assert_eq!(content(&display, "a"), "First");
        assert_eq!(display.buffer().text(), " block");
    }

    #[test]
    fn tab_commits_the_buffer() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("b"), 0));
        type_text(&mut display, "x");
        assert!(display.handle_key(KeyInput::new(Key::Tab)));
        assert_eq!(content(&display, "b"), "xSecond block with more content");
        assert!(!display.buffer().is_dirty());
        assert_eq!(display.buffer().caret(), 1);
    }

    #[test]
    fn store_caret_follows_native_movement() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("b"), 3));
        assert!(display.handle_key(KeyInput::new(Key::Left)));
        assert_eq!(
            display.store().caret_position(),
            Some(&CaretPosition::new(BlockId::from("b"), 2))
        );
    }

    #[test]
    fn focusing_another_block_commits_the_previous_one() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("a"), 0));
        type_text(&mut display, "> ");
        display.focus_caret(CaretPosition::new(BlockId::from("c"), 0));
        assert_eq!(content(&display, "a"), "> First block");
        assert_eq!(display.focus(), Focus::Editing(BlockId::from("c")));
    }

    #[test]
    fn render_tracks_cursor_and_layout() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("b"), 6));
        let result = display.render_outline(80);
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 1, column: 8 })
        );
        assert_eq!(display.last_cursor_visual(), result.cursor);
        assert_eq!(display.buffer().layout().len(), result.cursor_map.len());
    }

    #[test]
    fn click_moves_focus_and_commits() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("a"), 11));
        type_text(&mut display, "!");
        let result = display.render_outline(80);
        display.update_after_render(Rect::new(0, 0, 80, 10), result.total_lines);

        assert!(display.handle_click(4, 2, 0));

        assert_eq!(content(&display, "a"), "First block!");
        assert_eq!(
            display.store().caret_position(),
            Some(&CaretPosition::new(BlockId::from("c"), 2))
        );
        assert_eq!(display.buffer().text(), "Third");
    }

    #[test]
    fn click_outside_text_area_is_ignored() {
        let mut display = create_test_display();
        let result = display.render_outline(80);
        display.update_after_render(Rect::new(0, 0, 80, 3), result.total_lines);
        assert!(!display.handle_click(4, 5, 0));
        assert_eq!(display.focus(), Focus::Unfocused);
    }

    #[test]
    fn reset_discards_focus_and_edits() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("a"), 0));
        type_text(&mut display, "zzz");
        display.reset().unwrap();
        assert_eq!(display.focus(), Focus::Unfocused);
        assert!(!display.store().root().contains(&BlockId::from("a")));
    }

    #[test]
    fn persist_commits_live_text() {
        let mut display = create_test_display();
        display.focus_caret(CaretPosition::new(BlockId::from("c"), 0));
        type_text(&mut display, "1. ");
        display.persist().unwrap();
        assert_eq!(content(&display, "c"), "1. Third");
        assert!(!display.has_unsaved_changes());
        assert!(display.outline_json().unwrap().contains("1. Third"));
    }
}
