//! Runtime loop - ticks, input dispatch and frame output.
//!
//! Everything that owns components and signals runs on the caller's
//! thread. Two helper threads sit at the edges:
//!
//! ```text
//! stdin thread ──bytes──▶ InputRouter ──events──▶ ComponentTree
//!                                                     │
//!                                   Renderer ◀─signals┘
//!                                      │
//!                       frame bytes ──▶ writer thread ──▶ stdout
//! ```
//!
//! Each tick drains and dispatches every decoded event, then renders once.
//! Stop requests (Ctrl+C, SIGINT, [`StopHandle::stop`]) are honoured at
//! tick boundaries.
//!
//! # Headless use
//!
//! [`Tui::headless`] builds a runtime with an in-memory sink and no
//! terminal. Input is injected with [`Tui::inject`] and time is advanced by
//! calling [`Tui::tick_at`] explicitly.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::SIGINT;
use signal_hook::SigId;

use crate::error::Result;
use crate::input::{Event, InputMessage, InputRouter, StdinReader, DEFAULT_ESCAPE_TIMEOUT};
use crate::renderer::{FrameStats, MemorySink, OutputSink, Renderer, TerminalWriter};
use crate::terminal::{self, TerminalGuard};
use crate::theme::Style;
use crate::tree::ComponentTree;

// =============================================================================
// Config
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Time between ticks.
    pub refresh_interval: Duration,
    /// Style the frame is cleared to before painting.
    pub base_style: Style,
    /// How long a lone ESC (or any partial sequence) waits for more bytes.
    pub escape_timeout: Duration,
    /// Raw input chunks buffered between the reader thread and the router.
    pub input_queue_capacity: usize,
    pub mouse: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(1000 / 60),
            base_style: Style::new(),
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            input_queue_capacity: 64,
            mouse: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks per second. Zero is treated as one.
    pub fn fps(mut self, fps: u32) -> Self {
        self.refresh_interval = Duration::from_secs(1) / fps.max(1);
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn base_style(mut self, style: Style) -> Self {
        self.base_style = style;
        self
    }

    pub fn escape_timeout(mut self, timeout: Duration) -> Self {
        self.escape_timeout = timeout;
        self
    }

    pub fn input_queue_capacity(mut self, capacity: usize) -> Self {
        self.input_queue_capacity = capacity;
        self
    }

    pub fn mouse(mut self, mouse: bool) -> Self {
        self.mouse = mouse;
        self
    }
}

// =============================================================================
// StopHandle
// =============================================================================

/// Cooperative stop flag, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the runtime to stop at the next tick boundary.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn flag(&self) -> Arc<AtomicBool> {
        self.flag.clone()
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// Events dispatched, Ctrl+C included.
    pub events: usize,
    pub frame: FrameStats,
    /// True once a stop was requested.
    pub stopped: bool,
}

// =============================================================================
// Tui
// =============================================================================

pub struct Tui {
    config: Config,
    tree: ComponentTree,
    router: InputRouter,
    renderer: Renderer,
    sink: Box<dyn OutputSink>,
    stop: StopHandle,
}

impl Tui {
    /// A runtime sized to the terminal, writing through a writer thread.
    pub fn new(config: Config) -> Result<Self> {
        let (width, height) = terminal::size();
        let writer = TerminalWriter::spawn()?;
        Ok(Self::with_sink(config, width, height, writer))
    }

    /// A terminal-less runtime; frames are collected by the returned sink.
    pub fn headless(config: Config, width: u16, height: u16) -> (Self, MemorySink) {
        let sink = MemorySink::new();
        (Self::with_sink(config, width, height, sink.clone()), sink)
    }

    pub fn with_sink(
        config: Config,
        width: u16,
        height: u16,
        sink: impl OutputSink + 'static,
    ) -> Self {
        Self {
            config,
            tree: ComponentTree::new(width, height),
            router: InputRouter::new(config.input_queue_capacity, config.escape_timeout),
            renderer: Renderer::new(width, height, config.base_style),
            sink: Box::new(sink),
            stop: StopHandle::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ComponentTree {
        &mut self.tree
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Producer handle for raw input chunks.
    pub fn input_sender(&self) -> SyncSender<InputMessage> {
        self.router.sender()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Feed raw input bytes as if read from the terminal now.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.inject_at(bytes, Instant::now());
    }

    pub fn inject_at(&mut self, bytes: &[u8], now: Instant) {
        self.router.feed(bytes, now);
    }

    /// Queue an already decoded event for the next tick.
    pub fn push_event(&mut self, event: Event) {
        self.router.push(event);
    }

    /// Resize the tree and force a full redraw.
    pub fn resize(&mut self, width: u16, height: u16) {
        tracing::debug!(width, height, "resize");
        self.tree.resize(width, height);
        self.renderer.resize(width, height);
    }

    pub fn tick(&mut self) -> Result<TickReport> {
        self.tick_at(Instant::now())
    }

    /// One tick at time `now`: dispatch all pending events, render once.
    pub fn tick_at(&mut self, now: Instant) -> Result<TickReport> {
        self.router.poll(now);

        let mut events = 0;
        while let Some(event) = self.router.next_event() {
            events += 1;
            if is_interrupt(&event) {
                tracing::info!("ctrl+c received");
                self.stop.stop();
                continue;
            }
            self.router.dispatch(&mut self.tree, &event);
        }

        let (frame, bytes) = self.renderer.render(&self.tree)?;
        if !bytes.is_empty() {
            self.sink.submit(bytes)?;
        }

        Ok(TickReport {
            events,
            frame,
            stopped: self.stop.is_stopped(),
        })
    }

    /// Take over the terminal and tick until stopped.
    ///
    /// The terminal is restored before this returns, on errors too.
    pub fn run(&mut self) -> Result<()> {
        let mut guard = TerminalGuard::enter(self.config.mouse)?;
        let sigint = SigintFlag::register(self.stop.flag())?;
        let mut reader = StdinReader::spawn(self.router.sender())?;

        tracing::info!(
            width = self.tree.size().0,
            height = self.tree.size().1,
            interval_ms = self.config.refresh_interval.as_millis() as u64,
            "runtime started"
        );
        self.renderer.invalidate();
        let result = self.run_loop();

        reader.stop();
        drop(sigint);
        let closed = self.sink.close();
        guard.restore()?;
        tracing::info!("runtime stopped");

        result.and(closed)
    }

    fn run_loop(&mut self) -> Result<()> {
        let mut next_tick = Instant::now();
        while !self.stop.is_stopped() {
            let size = terminal::size();
            if size != self.tree.size() {
                self.resize(size.0, size.1);
            }

            let report = self.tick()?;
            if report.stopped {
                break;
            }

            next_tick += self.config.refresh_interval;
            let now = Instant::now();
            if next_tick < now {
                // Fell behind; don't try to catch up.
                next_tick = now;
            }
            let wake = match self.router.deadline() {
                Some(deadline) => deadline.min(next_tick),
                None => next_tick,
            };
            thread::sleep(wake.saturating_duration_since(now));
        }
        Ok(())
    }
}

fn is_interrupt(event: &Event) -> bool {
    matches!(event, Event::KeyPress(key) if key.is_ctrl('c'))
}

/// Sets the stop flag on SIGINT until dropped.
struct SigintFlag(SigId);

impl SigintFlag {
    fn register(flag: Arc<AtomicBool>) -> io::Result<Self> {
        signal_hook::flag::register(SIGINT, flag).map(Self)
    }
}

impl Drop for SigintFlag {
    fn drop(&mut self) {
        signal_hook::low_level::unregister(self.0);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Key, KeyPress};
    use crate::tree::Component;
    use crate::types::Rect;
    use crate::widgets::{Input, Text};

    #[test]
    fn test_config_fps() {
        let config = Config::new().fps(50);
        assert_eq!(config.refresh_interval, Duration::from_millis(20));
        assert_eq!(Config::new().fps(0).refresh_interval, Duration::from_secs(1));
        assert_eq!(Config::default().escape_timeout, Duration::from_millis(10));
    }

    #[test]
    fn test_first_tick_renders_then_idles() {
        let (mut tui, sink) = Tui::headless(Config::default(), 10, 2);
        let root = tui.tree().root();
        tui.tree_mut()
            .add(root, Component::new(Text::new("hi")).rect(Rect::at(0, 0)))
            .unwrap();

        let first = tui.tick().unwrap();
        assert!(first.frame.full_redraw);
        assert_eq!(sink.frame_count(), 1);

        let second = tui.tick().unwrap();
        assert!(second.frame.is_empty());
        assert_eq!(sink.frame_count(), 1);
    }

    #[test]
    fn test_ctrl_c_stops() {
        let (mut tui, _sink) = Tui::headless(Config::default(), 10, 2);
        let input = Input::new();
        let root = tui.tree().root();
        let id = tui
            .tree_mut()
            .add(root, Component::new(input.clone()).rect(Rect::new(0, 0, 10, 1)))
            .unwrap();
        tui.tree_mut().focus(id);

        tui.inject(b"a\x03b");
        let report = tui.tick().unwrap();
        assert!(report.stopped);
        assert_eq!(report.events, 3);
        assert_eq!(input.value(), "ab");
    }

    #[test]
    fn test_stop_handle_shared() {
        let (tui, _sink) = Tui::headless(Config::default(), 1, 1);
        let handle = tui.stop_handle();
        let other = handle.clone();
        std::thread::spawn(move || other.stop()).join().unwrap();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_sigint_flag_unregisters_on_drop() {
        let flag = Arc::new(AtomicBool::new(false));
        let sigint = SigintFlag::register(flag.clone()).unwrap();
        signal_hook::low_level::raise(SIGINT).unwrap();
        assert!(flag.load(Ordering::SeqCst));

        let id = sigint.0;
        drop(sigint);
        assert!(!signal_hook::low_level::unregister(id));
    }

    #[test]
    fn test_lone_escape_delivered_after_timeout() {
        let (mut tui, _sink) = Tui::headless(Config::default(), 10, 2);
        let seen = std::rc::Rc::new(std::cell::Cell::new(0));
        let root = tui.tree().root();
        let id = tui
            .tree_mut()
            .add(root, Component::new(Input::new()).rect(Rect::new(0, 0, 10, 1)))
            .unwrap();
        tui.tree_mut().focus(id);
        let seen_clone = seen.clone();
        tui.tree_mut()
            .on_key(id, move |key| {
                if key.key == Key::Escape {
                    seen_clone.set(seen_clone.get() + 1);
                }
            })
            .unwrap();

        let start = Instant::now();
        tui.inject_at(b"\x1b", start);
        assert_eq!(tui.tick_at(start).unwrap().events, 0);
        let report = tui.tick_at(start + Duration::from_millis(11)).unwrap();
        assert_eq!(report.events, 1);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_push_event() {
        let (mut tui, _sink) = Tui::headless(Config::default(), 4, 1);
        tui.push_event(Event::KeyPress(KeyPress::with_ctrl('c')));
        assert!(tui.tick().unwrap().stopped);
    }
}
