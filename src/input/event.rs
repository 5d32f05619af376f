//! Input event types.
//!
//! The decoder produces owned [`Event`]s; the router lends them to widgets
//! and handlers as `&Event`.

// =============================================================================
// Keys
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    /// Shift+Tab as sent by most terminals (`CSI Z`).
    BackTab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    F(u8),
    Null,
}

bitflags::bitflags! {
    /// Keyboard modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const NONE  = 0;
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
        const META  = 1 << 3;
    }
}

/// A decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub const fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// Key without modifiers.
    pub const fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// `Ctrl` + character.
    pub const fn with_ctrl(ch: char) -> Self {
        Self::new(Key::Char(ch), Modifiers::CTRL)
    }

    #[inline]
    pub fn ctrl(&self) -> bool {
        self.modifiers.contains(Modifiers::CTRL)
    }

    #[inline]
    pub fn alt(&self) -> bool {
        self.modifiers.contains(Modifiers::ALT)
    }

    #[inline]
    pub fn meta(&self) -> bool {
        self.modifiers.contains(Modifiers::META)
    }

    #[inline]
    pub fn shift(&self) -> bool {
        self.modifiers.contains(Modifiers::SHIFT)
    }

    /// True for `Ctrl` + `ch`, case-insensitive.
    pub fn is_ctrl(&self, ch: char) -> bool {
        self.ctrl() && matches!(self.key, Key::Char(c) if c.eq_ignore_ascii_case(&ch))
    }

    /// A printable character with no Ctrl/Alt/Meta held.
    pub fn text(&self) -> Option<char> {
        match self.key {
            Key::Char(c) if !c.is_control() && !self.ctrl() && !self.alt() && !self.meta() => {
                Some(c)
            }
            _ => None,
        }
    }
}

// =============================================================================
// Mouse
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

bitflags::bitflags! {
    /// Buttons held while a mouse event happened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        const NONE   = 0;
        const LEFT   = 1 << 0;
        const MIDDLE = 1 << 1;
        const RIGHT  = 1 << 2;
    }
}

impl From<MouseButton> for MouseButtons {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Self::LEFT,
            MouseButton::Middle => Self::MIDDLE,
            MouseButton::Right => Self::RIGHT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseKind {
    Press(MouseButton),
    Release(MouseButton),
    Drag(MouseButton),
    Move,
    ScrollUp,
    ScrollDown,
}

/// A decoded mouse event. Coordinates are 0-based screen cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseKind,
    pub column: u16,
    pub row: u16,
    pub buttons: MouseButtons,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    pub fn new(kind: MouseKind, column: u16, row: u16) -> Self {
        let buttons = match kind {
            MouseKind::Press(b) | MouseKind::Drag(b) => b.into(),
            _ => MouseButtons::NONE,
        };
        Self {
            kind,
            column,
            row,
            buttons,
            modifiers: Modifiers::NONE,
        }
    }
}

// =============================================================================
// Event
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    KeyPress(KeyPress),
    Mouse(MouseEvent),
}

/// What a handler subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyPress,
    Mouse,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::KeyPress(_) => EventKind::KeyPress,
            Self::Mouse(_) => EventKind::Mouse,
        }
    }
}

impl From<KeyPress> for Event {
    fn from(key: KeyPress) -> Self {
        Self::KeyPress(key)
    }
}

impl From<MouseEvent> for Event {
    fn from(mouse: MouseEvent) -> Self {
        Self::Mouse(mouse)
    }
}
