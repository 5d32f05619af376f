//! Input router - queue, decoding and event delivery.
//!
//! Raw byte chunks arrive through a bounded channel (fed by
//! [`StdinReader`](super::StdinReader) or by tests) and are decoded once per
//! tick. Decoded events are delivered:
//!
//! - **Keyboard**: Tab / Shift+Tab move focus. Everything else goes to the
//!   focused component: its widget's built-in handling first, then its
//!   `KeyPress` handlers in registration order.
//! - **Mouse**: hit-tested in reverse paint order. The first visible,
//!   mouse-capable component under the pointer receives it. A press focuses
//!   the target (when focusable) and marks it active until release.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::time::{Duration, Instant};

use super::decoder::Decoder;
use super::event::{Event, EventKind, Key, KeyPress, MouseEvent, MouseKind};
use super::reader::InputMessage;
use crate::tree::{ComponentId, ComponentTree};
use crate::types::ClipRect;
use crate::widgets::Widget;

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Tab / Shift+Tab handled by the router.
    Focus { changed: bool },
    /// Delivered to a component. `consumed` reports the widget's own handling.
    Delivered { target: ComponentId, consumed: bool },
    /// No focused component / nothing under the pointer.
    Unrouted,
}

pub struct InputRouter {
    decoder: Decoder,
    rx: Receiver<InputMessage>,
    tx: SyncSender<InputMessage>,
    queue: VecDeque<Event>,
    closed: bool,
}

impl InputRouter {
    /// `capacity` bounds the raw-chunk queue; `timeout` is the escape timeout.
    pub fn new(capacity: usize, timeout: Duration) -> Self {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        Self {
            decoder: Decoder::new(timeout),
            rx,
            tx,
            queue: VecDeque::new(),
            closed: false,
        }
    }

    /// A producer handle for the raw-chunk queue.
    pub fn sender(&self) -> SyncSender<InputMessage> {
        self.tx.clone()
    }

    /// True once the reader reported end of input.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain the channel and decode. Returns the number of queued events.
    pub fn poll(&mut self, now: Instant) -> usize {
        loop {
            match self.rx.try_recv() {
                Ok(InputMessage::Data(bytes)) => {
                    let events = self.decoder.feed(&bytes, now);
                    self.queue.extend(events);
                }
                Ok(InputMessage::Closed) => {
                    tracing::debug!("input closed");
                    self.closed = true;
                    let events = self.decoder.flush();
                    self.queue.extend(events);
                }
                Err(TryRecvError::Empty) => break,
                // Our own sender keeps the channel open.
                Err(TryRecvError::Disconnected) => break,
            }
        }

        let expired = self.decoder.flush_expired(now);
        self.queue.extend(expired);
        self.queue.len()
    }

    /// Decode bytes directly, bypassing the channel.
    pub fn feed(&mut self, bytes: &[u8], now: Instant) {
        let events = self.decoder.feed(bytes, now);
        self.queue.extend(events);
    }

    /// Queue an already decoded event.
    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn next_event(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// True while the decoder holds an incomplete sequence.
    pub fn is_decoding(&self) -> bool {
        self.decoder.has_pending()
    }

    /// When the held partial sequence times out, if there is one.
    pub fn deadline(&self) -> Option<Instant> {
        self.decoder.deadline()
    }

    /// Deliver one event.
    pub fn dispatch(&mut self, tree: &mut ComponentTree, event: &Event) -> Dispatch {
        match event {
            Event::KeyPress(key) => self.dispatch_key(tree, event, key),
            Event::Mouse(mouse) => self.dispatch_mouse(tree, event, mouse),
        }
    }

    fn dispatch_key(
        &mut self,
        tree: &mut ComponentTree,
        event: &Event,
        key: &KeyPress,
    ) -> Dispatch {
        if !key.ctrl() && !key.alt() {
            match key.key {
                Key::Tab if key.shift() => {
                    return Dispatch::Focus {
                        changed: tree.focus_previous(),
                    };
                }
                Key::Tab => {
                    return Dispatch::Focus {
                        changed: tree.focus_next(),
                    };
                }
                Key::BackTab => {
                    return Dispatch::Focus {
                        changed: tree.focus_previous(),
                    };
                }
                _ => {}
            }
        }

        let Some(target) = tree.focused() else {
            tracing::trace!(?key, "key with no focused component");
            return Dispatch::Unrouted;
        };
        deliver(tree, target, event, |widget, area| widget.on_key(key, area))
    }

    fn dispatch_mouse(
        &mut self,
        tree: &mut ComponentTree,
        event: &Event,
        mouse: &MouseEvent,
    ) -> Dispatch {
        let target = tree.hit_test(mouse.column, mouse.row);

        match mouse.kind {
            MouseKind::Press(_) => {
                if let Some(target) = target {
                    tree.focus(target);
                }
                tree.set_active(target);
            }
            MouseKind::Release(_) => tree.set_active(None),
            _ => {}
        }

        let Some(target) = target else {
            return Dispatch::Unrouted;
        };
        deliver(tree, target, event, |widget, area| {
            let local = (
                mouse.column.saturating_sub(area.x),
                mouse.row.saturating_sub(area.y),
            );
            widget.on_mouse(mouse, local, area)
        })
    }
}

/// Widget first, then handlers of the event's kind in registration order.
fn deliver(
    tree: &ComponentTree,
    target: ComponentId,
    event: &Event,
    builtin: impl FnOnce(&dyn Widget, ClipRect) -> bool,
) -> Dispatch {
    let consumed = match (tree.widget(target), tree.resolved_rect(target)) {
        (Some(widget), Some(area)) => builtin(widget, area),
        _ => false,
    };

    for handler in tree.handlers(target, event.kind()) {
        handler(event);
    }

    if event.kind() == EventKind::KeyPress {
        tracing::trace!(component = %target, consumed, "key delivered");
    }
    Dispatch::Delivered { target, consumed }
}

// =============================================================================
// Tests
// =============================================================================
