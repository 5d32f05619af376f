//! Themes - interaction state to style mapping.
//!
//! Every component carries a [`Theme`]. Each frame the renderer resolves
//! exactly one [`InteractionState`] per component, with priority
//! `Disabled > Active > Focused > Base`, and hands the resolved [`Style`] to
//! the paint routine. States without a style fall back to `base`.
//!
//! # Example
//!
//! ```
//! use ember_tui::theme::{InteractionState, Style, Theme};
//! use ember_tui::types::Rgba;
//!
//! let theme = Theme::new(Style::new().fg(Rgba::WHITE))
//!     .focused(Style::new().bg(Rgba::LIGHT_BLUE));
//!
//! assert_eq!(theme.resolve(InteractionState::Focused).bg, Rgba::LIGHT_BLUE);
//! assert_eq!(theme.resolve(InteractionState::Active), theme.base);
//! ```

use crate::types::{Attr, Cell, Rgba};

// =============================================================================
// Style
// =============================================================================

/// Foreground, background and attributes for a run of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: Attr,
}

impl Style {
    /// Terminal defaults, no attributes.
    pub const fn new() -> Self {
        Self {
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: Attr::NONE,
        }
    }

    pub const fn fg(mut self, fg: Rgba) -> Self {
        self.fg = fg;
        self
    }

    pub const fn bg(mut self, bg: Rgba) -> Self {
        self.bg = bg;
        self
    }

    pub fn attrs(mut self, attrs: Attr) -> Self {
        self.attrs |= attrs;
        self
    }

    pub fn bold(self) -> Self {
        self.attrs(Attr::BOLD)
    }

    pub fn invert(self) -> Self {
        self.attrs(Attr::INVERSE)
    }

    /// This style drawn over `base`: unset colors come from `base`,
    /// attributes are combined.
    pub fn over(self, base: Style) -> Self {
        Self {
            fg: if self.fg.is_terminal_default() { base.fg } else { self.fg },
            bg: if self.bg.is_terminal_default() { base.bg } else { self.bg },
            attrs: base.attrs | self.attrs,
        }
    }

    /// A blank cell in this style.
    pub fn blank(&self) -> Cell {
        self.cell(' ')
    }

    /// A cell holding `ch` in this style.
    pub fn cell(&self, ch: char) -> Cell {
        Cell {
            char: ch as u32,
            fg: self.fg,
            bg: self.bg,
            attrs: self.attrs,
        }
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Interaction State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Base,
    Focused,
    Active,
    Disabled,
}

impl InteractionState {
    /// Pick the single state for this frame.
    pub fn resolve(disabled: bool, active: bool, focused: bool) -> Self {
        if disabled {
            Self::Disabled
        } else if active {
            Self::Active
        } else if focused {
            Self::Focused
        } else {
            Self::Base
        }
    }
}

// =============================================================================
// Theme
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    pub base: Style,
    pub focused: Option<Style>,
    pub active: Option<Style>,
    pub disabled: Option<Style>,
}

impl Theme {
    pub const fn new(base: Style) -> Self {
        Self {
            base,
            focused: None,
            active: None,
            disabled: None,
        }
    }

    pub const fn focused(mut self, style: Style) -> Self {
        self.focused = Some(style);
        self
    }

    pub const fn active(mut self, style: Style) -> Self {
        self.active = Some(style);
        self
    }

    pub const fn disabled(mut self, style: Style) -> Self {
        self.disabled = Some(style);
        self
    }

    /// Style for `state`, falling back to `base`.
    pub fn resolve(&self, state: InteractionState) -> Style {
        let style = match state {
            InteractionState::Base => None,
            InteractionState::Focused => self.focused,
            InteractionState::Active => self.active,
            InteractionState::Disabled => self.disabled,
        };
        style.unwrap_or(self.base)
    }
}
