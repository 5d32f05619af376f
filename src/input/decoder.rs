//! Escape sequence decoder for terminal input.
//!
//! Decodes raw stdin bytes into [`Event`]s:
//! - CSI sequences (arrows, Home, End, Insert, Delete, PageUp/Down, F1-F12,
//!   modifier parameters, Shift+Tab)
//! - SS3 sequences (F1-F4, application-mode arrows)
//! - SGR and X10 mouse reports
//! - Kitty keyboard protocol (`CSI codepoint ; modifiers u`)
//! - Alt+key (ESC + char)
//! - Control keys (bytes 0-31, 127)
//! - UTF-8 text
//!
//! # Timeout
//!
//! A sequence that stops arriving half-way (a lone ESC, an unterminated
//! CSI) stays buffered until the escape timeout passes. The first stalled
//! byte is then emitted as a literal key and decoding resumes from the
//! byte after it. A lone ESC byte therefore becomes the Escape key.
//!
//! # Malformed input
//!
//! Never fatal. Invalid UTF-8 becomes U+FFFD; a CSI broken by a byte that
//! cannot appear inside it becomes Alt+`[` followed by whatever comes next.
//! Well-formed sequences with no meaning here (focus reports, key
//! releases) are dropped.

use std::time::{Duration, Instant};

use super::event::{
    Event, Key, KeyPress, Modifiers, MouseButton, MouseButtons, MouseEvent, MouseKind,
};

/// Default time to wait for the rest of an escape sequence.
pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(10);

// =============================================================================
// Decoder
// =============================================================================

/// Input decoder state machine.
///
/// Idle while the buffer is empty, Decoding while a prefix is buffered.
#[derive(Debug)]
pub struct Decoder {
    buf: Vec<u8>,
    timeout: Duration,
    /// When the buffered prefix stopped making progress.
    pending_since: Option<Instant>,
    /// Mouse buttons currently held, maintained from press/release reports.
    held: MouseButtons,
}

impl Decoder {
    pub fn new(timeout: Duration) -> Self {
        Self {
            buf: Vec::with_capacity(64),
            timeout,
            pending_since: None,
            held: MouseButtons::NONE,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decode `data`, keeping any incomplete trailing sequence.
    pub fn feed(&mut self, data: &[u8], now: Instant) -> Vec<Event> {
        self.buf.extend_from_slice(data);
        let mut events = Vec::new();
        let progressed = self.drain(&mut events);
        self.update_pending(progressed, now);
        events
    }

    /// True while an incomplete sequence is buffered.
    pub fn has_pending(&self) -> bool {
        !self.buf.is_empty()
    }

    /// When the buffered prefix will be flushed, if anything is buffered.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending_since.map(|since| since + self.timeout)
    }

    /// Flush a stalled prefix whose timeout has passed.
    pub fn flush_expired(&mut self, now: Instant) -> Vec<Event> {
        match self.deadline() {
            Some(deadline) if now >= deadline => {}
            _ => return Vec::new(),
        }

        let mut events = Vec::new();
        self.emit_literal(&mut events);
        self.drain(&mut events);
        self.update_pending(true, now);
        events
    }

    /// Flush everything buffered regardless of the timeout.
    pub fn flush(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while !self.buf.is_empty() {
            self.emit_literal(&mut events);
            self.drain(&mut events);
        }
        self.pending_since = None;
        events
    }

    fn update_pending(&mut self, progressed: bool, now: Instant) {
        if self.buf.is_empty() {
            self.pending_since = None;
        } else if progressed || self.pending_since.is_none() {
            self.pending_since = Some(now);
        }
    }

    /// Decode as much as possible. Returns true if any bytes were consumed.
    fn drain(&mut self, events: &mut Vec<Event>) -> bool {
        let before = self.buf.len();
        while !self.buf.is_empty() {
            match self.try_decode_one() {
                Step::Event(event) => events.push(event),
                Step::Skip => {}
                Step::Incomplete => break,
            }
        }
        self.buf.len() != before
    }

    /// Emit the first buffered byte on its own.
    fn emit_literal(&mut self, events: &mut Vec<Event>) {
        if self.buf.is_empty() {
            return;
        }
        let byte = self.buf[0];
        self.consume(1);
        let key = match byte {
            0x1B => KeyPress::plain(Key::Escape),
            0x00..=0x7F => control_or_ascii(byte),
            _ => {
                tracing::debug!(byte, "stalled utf-8 prefix");
                KeyPress::plain(Key::Char(char::REPLACEMENT_CHARACTER))
            }
        };
        events.push(Event::KeyPress(key));
    }

    fn try_decode_one(&mut self) -> Step {
        let first = self.buf[0];
        match first {
            0x1B => self.decode_escape(),
            0x00..=0x7F => {
                self.consume(1);
                Step::key(control_or_ascii(first))
            }
            _ => self.decode_utf8(),
        }
    }

    fn decode_escape(&mut self) -> Step {
        if self.buf.len() < 2 {
            return Step::Incomplete;
        }

        match self.buf[1] {
            b'[' => self.decode_csi(),
            b'O' => self.decode_ss3(),
            0x1B => {
                self.consume(2);
                Step::key(KeyPress::new(Key::Escape, Modifiers::ALT))
            }
            0x20..=0x7E => {
                let ch = self.buf[1] as char;
                self.consume(2);
                Step::key(KeyPress::new(Key::Char(ch), Modifiers::ALT))
            }
            0x7F => {
                self.consume(2);
                Step::key(KeyPress::new(Key::Backspace, Modifiers::ALT))
            }
            _ => {
                // Standalone ESC followed by something unrelated.
                self.consume(1);
                Step::key(KeyPress::plain(Key::Escape))
            }
        }
    }

    /// `ESC [` could not start a valid sequence: treat it as Alt+`[`.
    fn broken_csi(&mut self) -> Step {
        tracing::debug!(bytes = ?self.buf.get(..self.buf.len().min(8)), "malformed CSI");
        self.consume(2);
        Step::key(KeyPress::new(Key::Char('['), Modifiers::ALT))
    }

    fn decode_csi(&mut self) -> Step {
        if self.buf.len() < 3 {
            return Step::Incomplete;
        }

        match self.buf[2] {
            b'<' => return self.decode_sgr_mouse(),
            b'M' => return self.decode_x10_mouse(),
            _ => {}
        }

        // Parameter/intermediate bytes until the final byte (0x40-0x7E).
        let mut end = 2;
        loop {
            let Some(&byte) = self.buf.get(end) else {
                return Step::Incomplete;
            };
            match byte {
                0x20..=0x3F => end += 1,
                0x40..=0x7E => break,
                _ => return self.broken_csi(),
            }
        }

        let final_byte = self.buf[end];
        let params = parse_params(&self.buf[2..end]);
        self.consume(end + 1);

        if final_byte == b'u' {
            return decode_kitty_key(&params);
        }

        let modifiers = match params.get(1) {
            Some(&p) if p > 0 => decode_modifier(p),
            _ => Modifiers::NONE,
        };
        let key = |key| Step::key(KeyPress::new(key, modifiers));

        match final_byte {
            b'A' => key(Key::Up),
            b'B' => key(Key::Down),
            b'C' => key(Key::Right),
            b'D' => key(Key::Left),
            b'H' => key(Key::Home),
            b'F' => key(Key::End),
            b'P' => key(Key::F(1)),
            b'Q' => key(Key::F(2)),
            b'R' => key(Key::F(3)),
            b'S' => key(Key::F(4)),
            b'Z' => Step::key(KeyPress::new(Key::BackTab, Modifiers::SHIFT)),
            b'~' => match params.first().copied().unwrap_or(0) {
                1 | 7 => key(Key::Home),
                2 => key(Key::Insert),
                3 => key(Key::Delete),
                4 | 8 => key(Key::End),
                5 => key(Key::PageUp),
                6 => key(Key::PageDown),
                15 => key(Key::F(5)),
                17 => key(Key::F(6)),
                18 => key(Key::F(7)),
                19 => key(Key::F(8)),
                20 => key(Key::F(9)),
                21 => key(Key::F(10)),
                23 => key(Key::F(11)),
                24 => key(Key::F(12)),
                other => {
                    tracing::debug!(param = other, "unknown CSI ~ sequence");
                    Step::Skip
                }
            },
            other => {
                tracing::debug!(final_byte = other, "unhandled CSI sequence");
                Step::Skip
            }
        }
    }

    fn decode_ss3(&mut self) -> Step {
        if self.buf.len() < 3 {
            return Step::Incomplete;
        }

        let key = match self.buf[2] {
            b'A' => Key::Up,
            b'B' => Key::Down,
            b'C' => Key::Right,
            b'D' => Key::Left,
            b'H' => Key::Home,
            b'F' => Key::End,
            b'P' => Key::F(1),
            b'Q' => Key::F(2),
            b'R' => Key::F(3),
            b'S' => Key::F(4),
            _ => {
                self.consume(3);
                return Step::Skip;
            }
        };
        self.consume(3);
        Step::key(KeyPress::plain(key))
    }

    fn decode_sgr_mouse(&mut self) -> Step {
        // ESC [ < Pb ; Px ; Py (M | m)
        let mut end = 3;
        loop {
            let Some(&byte) = self.buf.get(end) else {
                return Step::Incomplete;
            };
            match byte {
                b'0'..=b'9' | b';' => end += 1,
                b'M' | b'm' => break,
                _ => return self.broken_csi(),
            }
        }

        let is_release = self.buf[end] == b'm';
        let parts = parse_params(&self.buf[3..end]);
        self.consume(end + 1);

        if parts.len() < 3 {
            tracing::debug!(?parts, "short SGR mouse report");
            return Step::Skip;
        }

        let column = clamp_u16(parts[1]).saturating_sub(1);
        let row = clamp_u16(parts[2]).saturating_sub(1);
        self.mouse_event(parts[0], is_release, column, row)
    }

    fn decode_x10_mouse(&mut self) -> Step {
        // ESC [ M Cb Cx Cy
        if self.buf.len() < 6 {
            return Step::Incomplete;
        }

        let cb = self.buf[3].wrapping_sub(32) as u32;
        let column = self.buf[4].wrapping_sub(33) as u16;
        let row = self.buf[5].wrapping_sub(33) as u16;
        self.consume(6);

        // X10 reports every release as button 3.
        let is_release = cb & 3 == 3 && cb & 64 == 0 && cb & 32 == 0;
        self.mouse_event(cb, is_release, column, row)
    }

    fn mouse_event(&mut self, cb: u32, is_release: bool, column: u16, row: u16) -> Step {
        let mut modifiers = Modifiers::NONE;
        if cb & 4 != 0 {
            modifiers |= Modifiers::SHIFT;
        }
        if cb & 8 != 0 {
            modifiers |= Modifiers::ALT;
        }
        if cb & 16 != 0 {
            modifiers |= Modifiers::CTRL;
        }

        let button = match cb & 3 {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            _ => MouseButton::Right,
        };

        let kind = if cb & 64 != 0 {
            match cb & 3 {
                0 => MouseKind::ScrollUp,
                1 => MouseKind::ScrollDown,
                _ => return Step::Skip,
            }
        } else if is_release {
            // X10 does not say which button; use the one we saw pressed.
            let released = if cb & 3 == 3 {
                held_button(self.held).unwrap_or(MouseButton::Left)
            } else {
                button
            };
            self.held.remove(released.into());
            MouseKind::Release(released)
        } else if cb & 32 != 0 {
            match cb & 3 {
                3 => MouseKind::Move,
                _ => MouseKind::Drag(button),
            }
        } else {
            self.held.insert(button.into());
            MouseKind::Press(button)
        };

        Step::Event(Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            buttons: self.held,
            modifiers,
        }))
    }

    fn decode_utf8(&mut self) -> Step {
        let first = self.buf[0];
        let expected_len = match first {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            _ => return self.malformed(1),
        };

        let available = self.buf.len().min(expected_len);
        if let Some(bad) = self.buf[1..available].iter().position(|b| b & 0xC0 != 0x80) {
            return self.malformed(bad + 1);
        }
        if self.buf.len() < expected_len {
            return Step::Incomplete;
        }

        match std::str::from_utf8(&self.buf[..expected_len]).ok().and_then(|s| s.chars().next()) {
            Some(ch) => {
                self.consume(expected_len);
                Step::key(KeyPress::plain(Key::Char(ch)))
            }
            None => self.malformed(expected_len),
        }
    }

    fn malformed(&mut self, len: usize) -> Step {
        tracing::debug!(bytes = ?&self.buf[..len], "invalid utf-8 input");
        self.consume(len);
        Step::key(KeyPress::plain(Key::Char(char::REPLACEMENT_CHARACTER)))
    }

    fn consume(&mut self, n: usize) {
        self.buf.drain(..n.min(self.buf.len()));
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_ESCAPE_TIMEOUT)
    }
}

// =============================================================================
// Helpers
// =============================================================================

enum Step {
    Event(Event),
    Incomplete,
    Skip,
}

impl Step {
    fn key(key: KeyPress) -> Self {
        Self::Event(Event::KeyPress(key))
    }
}

/// Single byte below 0x80 that is not ESC.
fn control_or_ascii(byte: u8) -> KeyPress {
    match byte {
        0x00 => KeyPress::new(Key::Null, Modifiers::CTRL),
        0x08 | 0x7F => KeyPress::plain(Key::Backspace),
        0x09 => KeyPress::plain(Key::Tab),
        0x0A | 0x0D => KeyPress::plain(Key::Enter),
        0x1B => KeyPress::plain(Key::Escape),
        0x01..=0x1A => KeyPress::with_ctrl((byte + b'a' - 1) as char),
        0x1C..=0x1F => KeyPress::with_ctrl((byte + b'4' - 0x1C) as char),
        _ => KeyPress::plain(Key::Char(byte as char)),
    }
}

fn decode_kitty_key(params: &[u32]) -> Step {
    let codepoint = params.first().copied().unwrap_or(0);
    let modifiers = params.get(1).map_or(Modifiers::NONE, |&m| decode_modifier(m));
    // Release events (state 3) carry no input.
    if params.get(2) == Some(&3) {
        return Step::Skip;
    }

    let key = match codepoint {
        9 => Key::Tab,
        13 => Key::Enter,
        27 => Key::Escape,
        127 => Key::Backspace,
        cp => match char::from_u32(cp) {
            Some(ch) => Key::Char(ch),
            None => Key::Null,
        },
    };
    Step::key(KeyPress::new(key, modifiers))
}

/// Decode a CSI modifier parameter (1-based bitmask).
fn decode_modifier(param: u32) -> Modifiers {
    let val = param.saturating_sub(1);
    let mut m = Modifiers::NONE;
    if val & 1 != 0 {
        m |= Modifiers::SHIFT;
    }
    if val & 2 != 0 {
        m |= Modifiers::ALT;
    }
    if val & 4 != 0 {
        m |= Modifiers::CTRL;
    }
    if val & 8 != 0 {
        m |= Modifiers::META;
    }
    m
}

/// `;`-separated decimal parameters. Sub-parameters after `:` are ignored.
fn parse_params(bytes: &[u8]) -> Vec<u32> {
    bytes
        .split(|b| *b == b';')
        .map(|part| {
            part.iter()
                .take_while(|b| b.is_ascii_digit())
                .fold(0u32, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as u32))
        })
        .collect()
}

fn clamp_u16(value: u32) -> u16 {
    value.min(u16::MAX as u32) as u16
}

fn held_button(held: MouseButtons) -> Option<MouseButton> {
    [MouseButton::Left, MouseButton::Middle, MouseButton::Right]
        .into_iter()
        .find(|b| held.contains((*b).into()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(data: &[u8]) -> Vec<Event> {
        Decoder::default().feed(data, Instant::now())
    }

    fn key(key: Key, modifiers: Modifiers) -> Event {
        Event::KeyPress(KeyPress::new(key, modifiers))
    }

    fn plain(k: Key) -> Event {
        key(k, Modifiers::NONE)
    }

    #[test]
    fn test_ascii_chars() {
        let events = decode(b"abc");
        assert_eq!(
            events,
            vec![plain(Key::Char('a')), plain(Key::Char('b')), plain(Key::Char('c'))]
        );
    }

    #[test]
    fn test_enter_and_backspace() {
        assert_eq!(decode(b"\r"), vec![plain(Key::Enter)]);
        assert_eq!(decode(b"\x7f"), vec![plain(Key::Backspace)]);
    }

    #[test]
    fn test_ctrl_keys() {
        assert_eq!(decode(b"\x03"), vec![key(Key::Char('c'), Modifiers::CTRL)]);
        assert_eq!(decode(b"\x01"), vec![key(Key::Char('a'), Modifiers::CTRL)]);
    }

    #[test]
    fn test_arrow_keys() {
        assert_eq!(decode(b"\x1b[A"), vec![plain(Key::Up)]);
        assert_eq!(decode(b"\x1b[B"), vec![plain(Key::Down)]);
        assert_eq!(decode(b"\x1b[C"), vec![plain(Key::Right)]);
        assert_eq!(decode(b"\x1b[D"), vec![plain(Key::Left)]);
        assert_eq!(decode(b"\x1bOA"), vec![plain(Key::Up)]);
    }

    #[test]
    fn test_modified_arrow() {
        assert_eq!(decode(b"\x1b[1;5C"), vec![key(Key::Right, Modifiers::CTRL)]);
    }

    #[test]
    fn test_function_keys() {
        assert_eq!(decode(b"\x1bOP"), vec![plain(Key::F(1))]);
        assert_eq!(decode(b"\x1b[15~"), vec![plain(Key::F(5))]);
    }

    #[test]
    fn test_shift_tab() {
        assert_eq!(decode(b"\x1b[Z"), vec![key(Key::BackTab, Modifiers::SHIFT)]);
    }

    #[test]
    fn test_alt_key() {
        assert_eq!(decode(b"\x1bx"), vec![key(Key::Char('x'), Modifiers::ALT)]);
    }

    #[test]
    fn test_delete_and_paging() {
        assert_eq!(decode(b"\x1b[3~"), vec![plain(Key::Delete)]);
        assert_eq!(decode(b"\x1b[5~"), vec![plain(Key::PageUp)]);
        assert_eq!(decode(b"\x1b[6~"), vec![plain(Key::PageDown)]);
    }

    #[test]
    fn test_kitty_ctrl_a() {
        assert_eq!(decode(b"\x1b[97;5u"), vec![key(Key::Char('a'), Modifiers::CTRL)]);
        assert!(decode(b"\x1b[97;5;3u").is_empty());
    }

    #[test]
    fn test_utf8() {
        assert_eq!(decode("é日".as_bytes()), vec![plain(Key::Char('é')), plain(Key::Char('日'))]);
    }

    #[test]
    fn test_invalid_utf8_becomes_replacement() {
        let events = decode(b"\xffa\xc3(");
        assert_eq!(
            events,
            vec![
                plain(Key::Char(char::REPLACEMENT_CHARACTER)),
                plain(Key::Char('a')),
                plain(Key::Char(char::REPLACEMENT_CHARACTER)),
                plain(Key::Char('(')),
            ]
        );
    }

    #[test]
    fn test_split_sequence_waits_for_rest() {
        let mut decoder = Decoder::default();
        let now = Instant::now();
        assert!(decoder.feed(b"\x1b[97;", now).is_empty());
        assert!(decoder.has_pending());
        assert_eq!(
            decoder.feed(b"5u", now),
            vec![key(Key::Char('a'), Modifiers::CTRL)]
        );
        assert!(!decoder.has_pending());
        assert_eq!(decoder.deadline(), None);
    }

    #[test]
    fn test_lone_escape_after_timeout() {
        let mut decoder = Decoder::new(Duration::from_millis(10));
        let start = Instant::now();
        assert!(decoder.feed(b"\x1b", start).is_empty());
        assert!(decoder.flush_expired(start + Duration::from_millis(5)).is_empty());
        assert_eq!(
            decoder.flush_expired(start + Duration::from_millis(10)),
            vec![plain(Key::Escape)]
        );
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_stalled_csi_emits_prefix_literally() {
        let mut decoder = Decoder::new(Duration::from_millis(10));
        let start = Instant::now();
        assert!(decoder.feed(b"\x1b[", start).is_empty());
        let events = decoder.flush_expired(start + Duration::from_millis(20));
        assert_eq!(events, vec![plain(Key::Escape), plain(Key::Char('['))]);
    }

    #[test]
    fn test_broken_csi_resumes() {
        let events = decode(b"\x1b[1\x1b[A");
        assert_eq!(
            events,
            vec![key(Key::Char('['), Modifiers::ALT), plain(Key::Char('1')), plain(Key::Up)]
        );
    }

    #[test]
    fn test_unknown_sequence_dropped() {
        // Focus-in report.
        assert_eq!(decode(b"\x1b[Ix"), vec![plain(Key::Char('x'))]);
    }

    #[test]
    fn test_sgr_mouse_press_release() {
        let mut decoder = Decoder::default();
        let now = Instant::now();
        let events = decoder.feed(b"\x1b[<0;10;20M", now);
        let Event::Mouse(press) = events[0] else {
            panic!("expected mouse event");
        };
        assert_eq!(press.kind, MouseKind::Press(MouseButton::Left));
        assert_eq!((press.column, press.row), (9, 19));
        assert_eq!(press.buttons, MouseButtons::LEFT);

        let events = decoder.feed(b"\x1b[<0;10;20m", now);
        let Event::Mouse(release) = events[0] else {
            panic!("expected mouse event");
        };
        assert_eq!(release.kind, MouseKind::Release(MouseButton::Left));
        assert!(release.buttons.is_empty());
    }

    #[test]
    fn test_sgr_scroll_and_drag() {
        let events = decode(b"\x1b[<64;1;1M\x1b[<65;1;1M\x1b[<32;3;4M");
        let kinds: Vec<_> = events
            .iter()
            .map(|e| match e {
                Event::Mouse(m) => m.kind,
                Event::KeyPress(_) => panic!("expected mouse event"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![MouseKind::ScrollUp, MouseKind::ScrollDown, MouseKind::Drag(MouseButton::Left)]
        );
    }

    #[test]
    fn test_x10_mouse() {
        // Press left at (0, 0), then release.
        let events = decode(b"\x1b[M !!\x1b[M#!!");
        let kinds: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Mouse(m) => Some((m.kind, m.column, m.row)),
                Event::KeyPress(_) => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                (MouseKind::Press(MouseButton::Left), 0, 0),
                (MouseKind::Release(MouseButton::Left), 0, 0),
            ]
        );
    }

    #[test]
    fn test_modifier_decode() {
        assert_eq!(decode_modifier(2), Modifiers::SHIFT);
        assert_eq!(decode_modifier(3), Modifiers::ALT);
        assert_eq!(decode_modifier(5), Modifiers::CTRL);
        assert_eq!(decode_modifier(9), Modifiers::META);
    }

    #[test]
    fn test_flush_everything() {
        let mut decoder = Decoder::default();
        decoder.feed(b"\x1b[1;", Instant::now());
        let events = decoder.flush();
        assert_eq!(events[0], plain(Key::Escape));
        assert!(!decoder.has_pending());
    }
}
