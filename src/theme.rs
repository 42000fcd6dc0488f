use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the outliner
#[derive(Clone, Debug)]
pub struct Theme {
    /// Background color for the outline
    pub background: Color,

    /// Foreground (text) color for the status bar
    pub status_bar_fg: Color,

    /// Background color for the status bar
    pub status_bar_bg: Color,

    /// Color for the storage key in the status bar
    pub storage_key_color: Color,

    /// Color of the bullet in front of every block
    pub bullet_color: Color,

    /// Color of the bullet in front of the block being edited
    pub focused_bullet_color: Color,

    /// Foreground color for inline code
    pub code_fg: Color,

    /// Background color for inline code
    pub code_bg: Color,

    /// Color for links
    pub link_color: Color,

    /// Foreground color for the JSON panel
    pub json_fg: Color,

    /// Border color for the panels
    pub border_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::Reset,
            status_bar_fg: Color::White,
            status_bar_bg: Color::Blue,
            storage_key_color: Color::LightYellow,
            bullet_color: Color::DarkGray,
            focused_bullet_color: Color::LightBlue,
            code_fg: Color::LightRed,
            code_bg: Color::Reset,
            link_color: Color::Blue,
            json_fg: Color::Gray,
            border_color: Color::DarkGray,
        }
    }
}

impl Theme {
    /// Create a new theme with default colors
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the style for the status bar
    pub fn status_bar_style(&self) -> Style {
        Style::default()
            .fg(self.status_bar_fg)
            .bg(self.status_bar_bg)
    }

    /// Get the style for the storage key in the status bar
    pub fn storage_key_style(&self) -> Style {
        Style::default().fg(self.storage_key_color)
    }

    pub fn bullet_style(&self) -> Style {
        Style::default().fg(self.bullet_color)
    }

    pub fn focused_bullet_style(&self) -> Style {
        Style::default()
            .fg(self.focused_bullet_color)
            .add_modifier(Modifier::BOLD)
    }

    /// Get the style for inline code
    pub fn code_style(&self) -> Style {
        Style::default().fg(self.code_fg).bg(self.code_bg)
    }

    /// Get the style for links
    pub fn link_style(&self) -> Style {
        Style::default()
            .fg(self.link_color)
            .add_modifier(Modifier::UNDERLINED)
    }

    pub fn json_style(&self) -> Style {
        Style::default().fg(self.json_fg)
    }

    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border_color)
    }
}
