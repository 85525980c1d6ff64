//! Theme and Styling
//!
//! Colors and styles for the storefront.

use ratatui::style::{Color, Modifier, Style};

/// Application theme
pub struct Theme;

impl Theme {
    // === Primary Colors ===

    /// Accent color (USDC blue)
    pub const ACCENT: Color = Color::Rgb(39, 117, 202);

    /// Paid, affordable and completed (green)
    pub const SUCCESS: Color = Color::Rgb(34, 197, 94);

    /// Payment in flight (amber)
    pub const WARNING: Color = Color::Rgb(251, 191, 36);

    /// Failed checkout (red)
    pub const ERROR: Color = Color::Rgb(239, 68, 68);

    // === Text Colors ===

    /// Primary text color
    pub const TEXT_PRIMARY: Color = Color::Rgb(229, 229, 229);

    /// Secondary text color (muted)
    pub const TEXT_SECONDARY: Color = Color::Rgb(161, 161, 161);

    /// Dimmed text
    pub const TEXT_DIM: Color = Color::Rgb(82, 82, 82);

    // === Background Colors ===

    /// Selected grid cell and disabled button background
    pub const BG_HIGHLIGHT: Color = Color::Rgb(38, 38, 38);

    // === Border Colors ===

    /// Default border color
    pub const BORDER: Color = Color::Rgb(51, 51, 51);

    /// Border of the focused pane (menu or cart)
    pub const BORDER_FOCUSED: Color = Color::Rgb(59, 130, 246);

    // === Styles ===

    /// Default text style
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    /// Secondary/muted text style
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Dimmed text style
    pub fn text_dim() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }

    /// Header title style
    pub fn title() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Section heading style
    pub fn heading() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    /// Success message style
    pub fn success() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    /// Warning style
    pub fn warning() -> Style {
        Style::default().fg(Self::WARNING)
    }

    /// Error message style
    pub fn error() -> Style {
        Style::default().fg(Self::ERROR)
    }

    /// Border style
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    /// Focused border style
    pub fn border_focused() -> Style {
        Style::default().fg(Self::BORDER_FOCUSED)
    }

    /// Selected item style
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .bg(Self::BG_HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Unit and total prices
    pub fn price() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    /// Keyboard shortcut key style
    pub fn shortcut_key() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Keyboard shortcut description style
    pub fn shortcut_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Active checkout stage
    pub fn active() -> Style {
        Style::default()
            .fg(Self::WARNING)
            .add_modifier(Modifier::BOLD)
    }

    /// Completed checkout stage
    pub fn complete() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    /// Checkout stage not reached yet
    pub fn pending() -> Style {
        Style::default().fg(Self::TEXT_DIM)
    }

    /// Enabled pay button
    pub fn button() -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    /// Disabled pay button
    pub fn button_disabled() -> Style {
        Style::default().fg(Self::TEXT_DIM).bg(Self::BG_HIGHLIGHT)
    }
}

/// Status icons
pub struct Icons;

impl Icons {
    /// Completed stage
    pub const COMPLETE: &'static str = "✓";
    /// Active stage
    pub const ACTIVE: &'static str = "●";
    /// Pending stage
    pub const PENDING: &'static str = "○";
    /// Failed stage
    pub const ERROR: &'static str = "✗";
    /// Stage separator
    pub const ARROW: &'static str = "→";
    /// Text input cursor
    pub const CURSOR: &'static str = "▌";
    /// Cart cursor
    pub const SELECTED: &'static str = "▶";
    /// Status bar separator
    pub const DOT: &'static str = "•";
    /// Payment-in-flight animation frames
    pub const SPINNER: [&'static str; 4] = ["◐", "◓", "◑", "◒"];
}
