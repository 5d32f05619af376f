//! Terminal setup and teardown.
//!
//! [`TerminalGuard`] puts the terminal into the mode the runtime expects
//! (raw input, alternate screen, hidden cursor, SGR mouse tracking, Kitty
//! keyboard disambiguation) and restores it when dropped, including on
//! early returns and panics that unwind through the runtime.

use std::io::{self, IsTerminal, Write};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::style::ResetColor;
use crossterm::terminal::{
    self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
};

use crate::error::Result;

/// Current terminal size as (columns, rows), 80x24 when unknown.
pub fn size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

/// Restores the terminal on drop.
pub struct TerminalGuard {
    raw: bool,
    mouse: bool,
    keyboard: bool,
    active: bool,
}

impl TerminalGuard {
    /// Enter fullscreen mode. Mouse tracking only when `mouse` is set.
    pub fn enter(mouse: bool) -> Result<Self> {
        let mut guard = Self {
            raw: false,
            mouse: false,
            keyboard: false,
            active: true,
        };

        // Piped stdin (tests, scripts) cannot go raw; rendering still works.
        if io::stdin().is_terminal() {
            terminal::enable_raw_mode()?;
            guard.raw = true;
        }

        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))?;

        if mouse {
            execute!(out, EnableMouseCapture)?;
            guard.mouse = true;
        }

        if guard.raw {
            execute!(
                out,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )?;
            guard.keyboard = true;
        }

        tracing::debug!(raw = guard.raw, mouse = guard.mouse, "terminal entered");
        Ok(guard)
    }

    /// Restore the terminal. Safe to call more than once.
    pub fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let mut out = io::stdout();
        if self.keyboard {
            execute!(out, PopKeyboardEnhancementFlags)?;
            self.keyboard = false;
        }
        if self.mouse {
            execute!(out, DisableMouseCapture)?;
            self.mouse = false;
        }
        execute!(out, ResetColor, Show, LeaveAlternateScreen)?;
        out.flush()?;

        if self.raw {
            terminal::disable_raw_mode()?;
            self.raw = false;
        }
        tracing::debug!("terminal restored");
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            tracing::warn!(error = %err, "failed to restore terminal");
        }
    }
}
