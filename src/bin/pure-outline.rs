use std::{
    io,
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use pure_outline::config::Config;
use pure_outline::editor::{Key, KeyInput};
use pure_outline::editor_display::EditorDisplay;
use pure_outline::export::export_markdown;
use pure_outline::logging;
use pure_outline::render::RenderResult;
use pure_outline::store::{FileStorage, Store};
use pure_outline::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const MOUSE_SCROLL_LINES: usize = 3;

/// A keyboard-driven terminal outliner.
#[derive(Parser, Debug)]
#[command(name = "pure-outline", version, about, long_about = None)]
struct Args {
    /// Load configuration from a specific file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the saved outline
    #[arg(long = "data-dir", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Save logs to a specific file
    #[arg(long = "log-file", value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Discard the saved outline and start from the default one
    #[arg(long = "reset")]
    reset: bool,

    /// Write the saved outline as Markdown to FILE and exit
    #[arg(long = "export", value_name = "FILE")]
    export: Option<PathBuf>,
}

fn main() -> Result<()> {
    run()
}

/// Width to wrap at and left padding for a text area `width` columns wide.
fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    if width == 0 {
        return (1, 0);
    }
    if width < 60 {
        let wrap_width = width.saturating_sub(1).max(1);
        return (wrap_width, 0);
    }
    if width < 100 {
        let padding = 2.min(width / 2);
        let wrap_width = width.saturating_sub(padding.saturating_mul(2)).max(1);
        return (wrap_width, padding);
    }
    let mut left_padding = width.saturating_sub(100) / 2 + 4;
    let max_padding = width.saturating_sub(1) / 2;
    if left_padding > max_padding {
        left_padding = max_padding;
    }
    let wrap_width = width.saturating_sub(left_padding.saturating_mul(2)).max(1);
    (wrap_width, left_padding)
}

fn run() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(file) = args.log_file {
        config.log_file = file;
    }
    logging::init(&config.log_file, &config.log_level)?;
    log::info!(
        "starting with outline {:?} in {}",
        config.storage_key,
        config.data_dir.display()
    );

    let storage = FileStorage::new(config.data_dir.clone());
    let mut store = Store::load(Box::new(storage), config.storage_key.clone());
    if args.reset {
        store
            .reset_to_initial()
            .context("failed to reset the saved outline")?;
    }

    if let Some(path) = args.export {
        return export_markdown(store.root(), &path);
    }

    let mut app = App::new(store, &config);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit() {
        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            app.handle_event(evt)?;
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.has_status_message();
            app.on_tick();
            last_tick = Instant::now();
            if had_message_before && !app.has_status_message() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

/// Maps a terminal key event onto the editor's key vocabulary.
fn key_input(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyInput> {
    let key = match code {
        KeyCode::Enter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::BackTab => {
            return Some(KeyInput::new(Key::Tab).with_shift());
        }
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::Esc => Key::Escape,
        KeyCode::Char(ch) => Key::Char(ch),
        _ => return None,
    };
    let mut input = KeyInput::new(key);
    if modifiers.contains(KeyModifiers::SHIFT) {
        input = input.with_shift();
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        input = input.with_ctrl();
    }
    if modifiers.contains(KeyModifiers::ALT) {
        input = input.with_alt();
    }
    Some(input)
}

struct App {
    display: EditorDisplay,
    autosave: bool,
    show_json: bool,
    scroll_top: usize,
    last_viewport_height: usize,
    last_total_lines: usize,
    status_message: Option<(String, Instant)>,
    should_quit: bool,
}

impl App {
    fn new(store: Store, config: &Config) -> Self {
        Self {
            display: EditorDisplay::new(store, Theme::default()),
            autosave: config.autosave,
            show_json: config.show_json,
            scroll_top: 0,
            last_viewport_height: 0,
            last_total_lines: 0,
            status_message: None,
            should_quit: false,
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn has_status_message(&self) -> bool {
        self.status_message.is_some()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let mut editor_area = vertical[0];
        let status_area = vertical[1];

        if self.show_json {
            let panels = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(editor_area);
            editor_area = panels[0];
            self.draw_json_panel(frame, panels[1]);
        }

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(editor_area);
        let scrollbar_area = horizontal[1];
        let (wrap_width, left_padding) = editor_wrap_configuration(horizontal[0].width as usize);
        let left_padding = left_padding as u16;
        let text_area = Rect::new(
            horizontal[0].x + left_padding,
            horizontal[0].y,
            horizontal[0].width.saturating_sub(left_padding),
            horizontal[0].height,
        );

        let render = self.display.render_outline(wrap_width);
        self.display
            .update_after_render(text_area, render.total_lines);
        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);
        self.last_viewport_height = viewport_height;
        self.last_total_lines = render.total_lines;

        let paragraph = Paragraph::new(Text::from(render.lines.clone()))
            .style(Style::default().bg(self.display.theme().background))
            .block(Block::default().borders(Borders::NONE))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);

        self.draw_scrollbar(frame, scrollbar_area);

        if let Some(cursor) = self.display.last_cursor_visual()
            && cursor.line >= self.scroll_top
            && cursor.line < self.scroll_top + viewport_height
            && text_area.width > 0
        {
            let cursor_y = text_area.y + (cursor.line - self.scroll_top) as u16;
            let cursor_x = text_area.x + cursor.column.min(text_area.width - 1);
            frame.set_cursor_position(Position::new(cursor_x, cursor_y));
        }

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::NONE))
            .style(self.display.theme().status_bar_style());
        frame.render_widget(status_widget, status_area);
    }

    fn draw_json_panel(&self, frame: &mut Frame, area: Rect) {
        let theme = self.display.theme();
        let json = match self.display.outline_json() {
            Ok(json) => json,
            Err(err) => format!("failed to serialize outline: {err}"),
        };
        let panel = Paragraph::new(json)
            .style(theme.json_style())
            .wrap(Wrap { trim: false })
            .block(
                Block::default()
                    .borders(Borders::LEFT)
                    .border_style(theme.border_style())
                    .title(" JSON "),
            );
        frame.render_widget(panel, area);
    }

    fn draw_scrollbar(&self, frame: &mut Frame, area: Rect) {
        let viewport = self.last_viewport_height;
        if area.height == 0 || viewport == 0 || self.last_total_lines <= viewport {
            return;
        }

        let knob_size = ((viewport * viewport) / self.last_total_lines).clamp(1, viewport);
        let max_scroll = self.last_total_lines.saturating_sub(viewport).max(1);
        let knob_start = (self.scroll_top.min(max_scroll) * (viewport - knob_size)) / max_scroll;
        let knob_end = knob_start.saturating_add(knob_size);

        for row in 0..viewport.min(area.height as usize) {
            let y = area.y + row as u16;
            let style = if row >= knob_start && row < knob_end {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let span = Span::styled(" ", style);
            frame.render_widget(
                Paragraph::new(Line::from(span)),
                Rect::new(area.x, y, 1, 1),
            );
        }
    }

    fn cursor_position_text(&self) -> String {
        match self.display.store().caret_position() {
            Some(caret) => {
                let id = caret.block_id.as_str();
                let short: String = id.chars().take(8).collect();
                format!("{short}:{}", caret.offset)
            }
            None => "-".to_string(),
        }
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();
        let theme = self.display.theme().clone();

        if let Some((message, _)) = &self.status_message {
            let position = self.cursor_position_text();
            return Line::from(vec![
                Span::raw(format!("{position} ")),
                Span::raw(message.clone()),
            ]);
        }

        let position = self.cursor_position_text();
        let marker = if self.display.has_unsaved_changes() {
            "*"
        } else {
            ""
        };
        let blocks = self.display.store().root().block_count().saturating_sub(1);

        let all_shortcuts = ["^K:Reset", "F2:JSON", "^S:Save", "^Q:Quit"];

        let mut spans = vec![
            Span::raw(position),
            Span::raw(" "),
            Span::styled(
                format!("{}{marker}", self.display.store().storage_key()),
                theme.storage_key_style(),
            ),
            Span::raw(format!(", {blocks} blocks")),
        ];

        let left_width: usize = spans.iter().map(|span| span.content.chars().count()).sum();

        let min_padding = 1;
        let mut shortcuts_to_show = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shortcuts_to_show.is_empty() {
                shortcut.chars().count()
            } else {
                shortcuts_width + 1 + shortcut.chars().count()
            };
            if left_width + min_padding + test_width <= terminal_width {
                shortcuts_to_show.insert(0, *shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }

        if !shortcuts_to_show.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(min_padding);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shortcuts_to_show.join(" ")));
        }

        Line::from(spans)
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
        if self.display.cursor_following()
            && let Some(cursor) = self.display.last_cursor_visual()
        {
            self.scroll_top = self.scroll_top_for_cursor(cursor.line, viewport, max_scroll);
        }
    }

    fn scroll_top_for_cursor(&self, cursor_line: usize, viewport: usize, max_scroll: usize) -> usize {
        let mut scroll = self.scroll_top.min(max_scroll);
        let margin = if viewport >= 3 { 1 } else { 0 };
        let top_limit = scroll.saturating_add(margin);
        let bottom_offset = viewport.saturating_sub(1).saturating_sub(margin);
        let bottom_limit = scroll.saturating_add(bottom_offset);
        if cursor_line < top_limit {
            scroll = cursor_line.saturating_sub(margin);
        } else if cursor_line > bottom_limit {
            scroll = cursor_line.saturating_sub(bottom_offset);
        }
        scroll.min(max_scroll)
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        if delta == 0 {
            return;
        }
        self.display.detach_cursor_follow();
        let viewport = self.display.last_view_height().max(1);
        let max_scroll = self.display.last_total_lines().saturating_sub(viewport);
        let new_scroll = (self.scroll_top as isize + delta).clamp(0, max_scroll as isize);
        self.scroll_top = new_scroll as usize;
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        match event.kind {
            MouseEventKind::ScrollUp => {
                self.scroll_by_lines(-(MOUSE_SCROLL_LINES as isize));
            }
            MouseEventKind::ScrollDown => {
                self.scroll_by_lines(MOUSE_SCROLL_LINES as isize);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                self.prune_status_message();
                if self
                    .display
                    .handle_click(event.column, event.row, self.scroll_top)
                {
                    self.autosave();
                }
            }
            _ => {}
        }
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => match (code, modifiers) {
                (KeyCode::Char('q'), m) | (KeyCode::Char('c'), m)
                    if m.contains(KeyModifiers::CONTROL) =>
                {
                    self.display.blur();
                    self.save()?;
                    self.should_quit = true;
                }
                (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.save()?;
                }
                (KeyCode::Char('k'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.display
                        .reset()
                        .context("failed to reset the outline")?;
                    self.scroll_top = 0;
                    self.set_status("Outline reset");
                }
                (KeyCode::F(2), _) => {
                    self.show_json = !self.show_json;
                }
                _ => {
                    if let Some(input) = key_input(code, modifiers)
                        && self.display.handle_key(input)
                    {
                        self.autosave();
                    }
                }
            },
            Event::Mouse(mouse) => self.handle_mouse_event(mouse),
            _ => {}
        }
        Ok(())
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    /// Writes the committed outline when an edit changed it.
    fn autosave(&mut self) {
        if !self.autosave || !self.display.store().is_dirty() {
            return;
        }
        if let Err(err) = self.display.store_mut().persist() {
            log::error!("autosave failed: {err}");
            self.set_status(format!("Autosave failed: {err}"));
        }
    }

    fn save(&mut self) -> Result<()> {
        self.display.persist().context("failed to save outline")?;
        self.set_status("Saved");
        Ok(())
    }
}
