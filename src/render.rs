use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::block::{Block, BlockId};
use crate::editor::CaretPosition;
use crate::markdown::{Segment, parse_inline_markdown};
use crate::theme::Theme;

const BULLET: &str = "• ";
const INDENT: &str = "  ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// Screen position of every caret offset of every visible block.
    pub cursor_map: Vec<(CaretPosition, CursorVisualPosition)>,
}

/// The block being edited, shown as raw text instead of rendered markdown.
#[derive(Clone, Copy, Debug)]
pub struct FocusedBlock<'a> {
    pub block_id: &'a BlockId,
    pub text: &'a str,
    pub caret: usize,
}

/// Lays out every block below `root` as a bulleted, indented list wrapped
/// to `width` columns.
pub fn render_outline(
    root: &Block,
    width: usize,
    focus: Option<FocusedBlock<'_>>,
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(width.max(1), theme);
    for (depth, block) in root.iter().skip(1) {
        let focused = focus.filter(|focus| focus.block_id == block.id());
        renderer.render_block(block, depth, focused);
    }
    renderer.finish()
}

struct Renderer<'a> {
    wrap_width: usize,
    theme: &'a Theme,
    cursor: Option<CursorVisualPosition>,
    cursor_map: Vec<(CaretPosition, CursorVisualPosition)>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
}

impl<'a> Renderer<'a> {
    fn new(wrap_width: usize, theme: &'a Theme) -> Self {
        Self {
            wrap_width,
            theme,
            cursor: None,
            cursor_map: Vec::new(),
            lines: Vec::new(),
            current_line_index: 0,
        }
    }

    fn render_block(&mut self, block: &Block, depth: usize, focus: Option<FocusedBlock<'_>>) {
        let indent = INDENT.repeat(depth.saturating_sub(1));
        let first_prefix = format!("{indent}{BULLET}");
        let continuation_prefix = format!("{indent}{INDENT}");

        let mut collector = FragmentCollector::default();
        match focus {
            Some(focus) => collect_raw(focus.text, focus.caret, &mut collector),
            None => collect_segments(block.content(), self.theme, &mut collector),
        }
        let fragments = collector.finish();

        let prefix_style = if focus.is_some() {
            self.theme.focused_bullet_style()
        } else {
            self.theme.bullet_style()
        };
        let lines = wrap_fragments(
            &fragments,
            &first_prefix,
            &continuation_prefix,
            prefix_style,
            self.wrap_width,
        );
        self.consume_lines(block.id(), lines);
    }

    fn consume_lines(&mut self, block_id: &BlockId, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            for event in output.events {
                let position = CursorVisualPosition {
                    line: self.current_line_index,
                    column: event.column,
                };
                match event.kind {
                    TextEventKind::Cursor => {
                        self.cursor = Some(position);
                    }
                    TextEventKind::Offset(offset) => {
                        self.cursor_map
                            .push((CaretPosition::new(block_id.clone(), offset), position));
                    }
                }
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
            cursor_map: self.cursor_map,
        }
    }
}

/// Raw text of the focused block, with a caret stop before every char.
fn collect_raw(text: &str, caret: usize, collector: &mut FragmentCollector) {
    let len = text.chars().count();
    let caret = caret.min(len);
    for (offset, ch) in text.chars().enumerate() {
        collector.push_stop(offset, offset == caret);
        collector.push_char(ch, Style::default());
    }
    collector.push_stop(len, caret == len);
}

/// Rendered markdown. Caret stops map displayed chars back to raw offsets.
fn collect_segments(raw: &str, theme: &Theme, collector: &mut FragmentCollector) {
    let mut segment_start = 0;
    for segment in parse_inline_markdown(raw) {
        let style = match &segment {
            Segment::Text { .. } => Style::default(),
            Segment::Code { .. } => theme.code_style(),
            Segment::Link { .. } => theme.link_style(),
        };
        let value_start = segment_start + segment.value_source_offset();
        for (idx, ch) in segment.value().chars().enumerate() {
            collector.push_stop(value_start + idx, false);
            collector.push_char(ch, style);
        }
        segment_start += segment.source_len();
    }
    collector.push_stop(raw.chars().count(), false);
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone)]
struct LineOutput {
    spans: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
}

#[derive(Clone, Copy)]
struct LocatedEvent {
    column: u16,
    kind: TextEventKind,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

#[derive(Clone)]
struct TextEvent {
    offset: usize,
    kind: TextEventKind,
}

#[derive(Clone, Copy)]
enum TextEventKind {
    Offset(usize),
    Cursor,
}

/// Groups chars into word and whitespace fragments, attaching caret stops
/// to the fragment they precede.
#[derive(Default)]
struct FragmentCollector {
    fragments: Vec<FragmentItem>,
    builder: Option<TokenBuilder>,
    pending_events: Vec<TextEvent>,
}

impl FragmentCollector {
    fn push_stop(&mut self, offset: usize, is_cursor: bool) {
        self.pending_events.push(TextEvent {
            offset: 0,
            kind: TextEventKind::Offset(offset),
        });
        if is_cursor {
            self.pending_events.push(TextEvent {
                offset: 0,
                kind: TextEventKind::Cursor,
            });
        }
    }

    fn push_char(&mut self, ch: char, style: Style) {
        match ch {
            '\r' => {}
            '\n' => {
                self.flush();
                self.flush_events(style);
                self.fragments.push(FragmentItem::LineBreak);
            }
            '\t' => {
                for _ in 0..4 {
                    self.push_visible(' ', style);
                }
            }
            _ => self.push_visible(ch, style),
        }
    }

    fn push_visible(&mut self, ch: char, style: Style) {
        let is_whitespace = ch.is_whitespace();
        let continues = self
            .builder
            .as_ref()
            .is_some_and(|existing| existing.continues(is_whitespace, style));
        if !continues {
            self.flush();
            self.builder = Some(TokenBuilder::new(style, is_whitespace));
        }
        if let Some(builder) = self.builder.as_mut() {
            builder.add_events(&mut self.pending_events);
            builder.push_char(ch);
        }
    }

    /// Pending stops stay pending: they belong to whatever comes next.
    fn flush(&mut self) {
        if let Some(token) = self.builder.take() {
            self.fragments.push(FragmentItem::Token(token.finish()));
        }
    }

    /// Stops with no char after them still need a place on the line.
    fn flush_events(&mut self, style: Style) {
        if self.pending_events.is_empty() {
            return;
        }
        self.fragments.push(FragmentItem::Token(Fragment {
            text: String::new(),
            style,
            kind: FragmentKind::Word,
            width: 0,
            events: self.pending_events.drain(..).collect(),
        }));
    }

    fn finish(mut self) -> Vec<FragmentItem> {
        self.flush();
        self.flush_events(Style::default());
        self.fragments
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            events: Vec::new(),
        }
    }

    fn continues(&self, is_whitespace: bool, style: Style) -> bool {
        self.style == style
            && matches!(
                (self.kind, is_whitespace),
                (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
            )
    }

    fn add_events(&mut self, pending: &mut Vec<TextEvent>) {
        for mut event in pending.drain(..) {
            event.offset = self.width;
            self.events.push(event);
        }
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            events: self.events,
        }
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &str,
    continuation_prefix: &str,
    prefix_style: Style,
    width: usize,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix, prefix_style);
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new(continuation_prefix, prefix_style);
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.current_width() > builder.prefix_width
                        && builder.current_width() + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new(continuation_prefix, prefix_style);
                    }

                    builder.append_with_pending(token.clone(), &mut pending_whitespace);
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: &str, prefix_style: Style) -> Self {
        let prefix_width = visible_width(prefix);
        let mut segments = Vec::new();
        if !prefix.is_empty() {
            segments.push(LineSegment {
                text: prefix.to_string(),
                style: prefix_style,
            });
        }
        Self {
            segments,
            events: Vec::new(),
            width: prefix_width,
            prefix_width,
        }
    }

    fn current_width(&self) -> usize {
        self.width
    }

    fn append_with_pending(&mut self, token: Fragment, pending_whitespace: &mut Vec<Fragment>) {
        self.consume_pending(pending_whitespace);
        self.append_token(token);
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        if !fragment.text.is_empty() {
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
            self.width += fragment.width;
        }

        for event in fragment.events {
            let column = u16::try_from(start + event.offset).unwrap_or(u16::MAX);
            self.events.push(LocatedEvent {
                column,
                kind: event.kind,
            });
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        self.events.sort_by_key(|event| event.column);
        LineOutput {
            spans: self.segments,
            events: self.events,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    fn leaf(id: &str, content: &str) -> Block {
        Block::from_parts(BlockId::from(id), content, Vec::new())
    }

    fn outline() -> Block {
        Block::from_parts(
            BlockId::from("root"),
            "",
            vec![
                Rc::new(Block::from_parts(
                    BlockId::from("a"),
                    "alpha",
                    vec![Rc::new(leaf("a1", "nested"))],
                )),
                Rc::new(leaf("b", "see `x` and [docs](http://d)")),
            ],
        )
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect()
    }

    fn position_of(result: &RenderResult, id: &str, offset: usize) -> Option<CursorVisualPosition> {
        result
            .cursor_map
            .iter()
            .find(|(caret, _)| caret.block_id.as_str() == id && caret.offset == offset)
            .map(|(_, position)| *position)
    }

    #[test]
    fn blocks_render_as_indented_bullets() {
        let result = render_outline(&outline(), 80, None, &Theme::default());
        let texts: Vec<String> = result.lines.iter().map(line_text).collect();
        assert_eq!(
            texts,
            vec!["• alpha", "  • nested", "• see x and docs"]
        );
        assert_eq!(result.total_lines, 3);
        assert!(result.cursor.is_none());
    }

    #[test]
    fn markdown_stops_point_at_raw_offsets() {
        let result = render_outline(&outline(), 80, None, &Theme::default());
        // `x` is at raw offset 5, displayed at column 2 + 4.
        assert_eq!(
            position_of(&result, "b", 5),
            Some(CursorVisualPosition { line: 2, column: 6 })
        );
        // Link label `docs` starts at raw offset 13.
        assert_eq!(
            position_of(&result, "b", 13),
            Some(CursorVisualPosition { line: 2, column: 12 })
        );
        let len = "see `x` and [docs](http://d)".chars().count();
        assert_eq!(
            position_of(&result, "b", len),
            Some(CursorVisualPosition { line: 2, column: 16 })
        );
    }

    #[test]
    fn focused_block_shows_raw_text_and_cursor() {
        let root = outline();
        let id = BlockId::from("b");
        let focus = FocusedBlock {
            block_id: &id,
            text: "raw `x`",
            caret: 4,
        };
        let result = render_outline(&root, 80, Some(focus), &Theme::default());
        assert_eq!(line_text(&result.lines[2]), "• raw `x`");
        assert_eq!(
            result.cursor,
            Some(CursorVisualPosition { line: 2, column: 6 })
        );
        assert_eq!(
            position_of(&result, "b", 7),
            Some(CursorVisualPosition { line: 2, column: 9 })
        );
    }

    #[test]
    fn embedded_newlines_continue_under_the_bullet() {
        let root = Block::from_parts(
            BlockId::from("root"),
            "",
            vec![Rc::new(leaf("m", "one\ntwo"))],
        );
        let result = render_outline(&root, 80, None, &Theme::default());
        let texts: Vec<String> = result.lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["• one", "  two"]);
        assert_eq!(
            position_of(&result, "m", 4),
            Some(CursorVisualPosition { line: 1, column: 2 })
        );
        assert_eq!(
            position_of(&result, "m", 3),
            Some(CursorVisualPosition { line: 0, column: 5 })
        );
    }

    #[test]
    fn empty_block_still_has_a_caret_stop() {
        let root = Block::from_parts(BlockId::from("root"), "", vec![Rc::new(leaf("e", ""))]);
        let result = render_outline(&root, 80, None, &Theme::default());
        assert_eq!(line_text(&result.lines[0]), "• ");
        assert_eq!(
            position_of(&result, "e", 0),
            Some(CursorVisualPosition { line: 0, column: 2 })
        );
    }

    #[test]
    fn long_blocks_wrap_at_word_boundaries() {
        let root = Block::from_parts(
            BlockId::from("root"),
            "",
            vec![Rc::new(leaf("w", "alpha beta gamma"))],
        );
        let result = render_outline(&root, 12, None, &Theme::default());
        let texts: Vec<String> = result.lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["• alpha beta ", "  gamma"]);
        assert_eq!(
            position_of(&result, "w", 11),
            Some(CursorVisualPosition { line: 1, column: 2 })
        );
    }

    #[test]
    fn empty_outline_renders_one_blank_line() {
        let result = render_outline(&Block::root(Vec::new()), 80, None, &Theme::default());
        assert_eq!(result.total_lines, 1);
        assert!(result.cursor_map.is_empty());
    }
}
