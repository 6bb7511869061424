//! Color palette shared by all widgets.

use ratatui::style::{Color, Modifier, Style};

pub mod colors {
    use ratatui::style::Color;

    pub const STATUS_SUCCESS: Color = Color::Rgb(80, 200, 120);
    pub const STATUS_ERROR: Color = Color::Rgb(225, 85, 85);
    pub const MARKER_ONT: Color = Color::Rgb(95, 175, 255);
    pub const MARKER_CTO: Color = Color::Rgb(250, 190, 80);
    pub const MARKER_LINK: Color = Color::Rgb(130, 130, 150);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ThemePalette {
    pub text: Color,
    pub accent: Color,
    pub accent_alt: Color,
    pub hint: Color,
    pub selection_bg: Color,
}

impl ThemePalette {
    pub fn title(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .add_modifier(Modifier::BOLD)
    }
}

pub fn palette(theme: Theme) -> ThemePalette {
    match theme {
        Theme::Dark => ThemePalette {
            text: Color::Rgb(220, 220, 220),
            accent: Color::Rgb(120, 180, 255),
            accent_alt: Color::Rgb(250, 190, 80),
            hint: Color::Rgb(130, 130, 140),
            selection_bg: Color::Rgb(50, 60, 85),
        },
        Theme::Light => ThemePalette {
            text: Color::Rgb(30, 30, 30),
            accent: Color::Rgb(0, 90, 200),
            accent_alt: Color::Rgb(175, 110, 0),
            hint: Color::Rgb(110, 110, 120),
            selection_bg: Color::Rgb(200, 215, 240),
        },
    }
}
