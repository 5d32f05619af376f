//! Signals - Reactive cells with change notification.
//!
//! A [`Signal`] holds a value, a version counter and a list of subscribers.
//! Reads come in two flavours:
//!
//! - `get` / `with` - read AND subscribe the current tracking scope
//! - `peek` / `with_peek` - read only
//!
//! Tracking scopes are [`Observer`]s pushed on a thread-local stack by
//! [`track`]. The renderer runs every component's paint routine inside its
//! observer, so whatever signals a paint reads become that component's
//! dependencies without any manual wiring.
//!
//! # Notification
//!
//! `set` notifies synchronously. A `set` issued while another notification
//! pass is running is queued and flushed after that pass completes, so
//! notification never recurses and every callback reads the latest value.
//!
//! # Example
//!
//! ```
//! use ember_tui::signals::{signal, track, Observer};
//!
//! let count = signal(0);
//! let observer = Observer::new();
//! let seen = track(&observer, || count.get());
//! assert_eq!(seen, 0);
//!
//! count.set(1);
//! assert!(observer.is_dirty());
//! ```

mod observer;

pub use observer::{track, untrack, Observer};

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::rc::{Rc, Weak};

/// What a subscriber callback returns. Errors are logged and isolated.
pub type CallbackResult = Result<(), Box<dyn Error>>;

type Callback = Rc<dyn Fn() -> CallbackResult>;

// =============================================================================
// Subscriber List
// =============================================================================

struct Subscriber {
    id: u64,
    /// Set when the subscriber is an observer, used to dedupe tracked reads.
    observer: Option<u64>,
    callback: Callback,
}

type SubscriberList = RefCell<Vec<Subscriber>>;

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
    static NOTIFY_QUEUE: RefCell<NotifyQueue> = RefCell::new(NotifyQueue::default());
}

pub(crate) fn next_id() -> u64 {
    NEXT_ID.with(|id| {
        let next = id.get();
        id.set(next + 1);
        next
    })
}

/// Handle to one registration on a signal.
///
/// Dropping the handle keeps the subscription alive; call [`cancel`](Self::cancel)
/// to remove it.
pub struct Subscription {
    list: Weak<SubscriberList>,
    id: u64,
}

impl Subscription {
    /// Remove the subscriber. No-op if the signal is already gone.
    pub fn cancel(&self) {
        if let Some(list) = self.list.upgrade() {
            list.borrow_mut().retain(|s| s.id != self.id);
        }
    }

    /// True while the signal is alive and still holds this subscriber.
    pub fn is_active(&self) -> bool {
        self.list
            .upgrade()
            .is_some_and(|list| list.borrow().iter().any(|s| s.id == self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// =============================================================================
// Notification Queue
// =============================================================================

#[derive(Default)]
struct NotifyQueue {
    flushing: bool,
    batches: VecDeque<Vec<Callback>>,
}

/// Resets the flushing flag even if a callback panics.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        NOTIFY_QUEUE.with(|q| {
            let mut q = q.borrow_mut();
            q.flushing = false;
            q.batches.clear();
        });
    }
}

/// Queue a batch and, unless a flush is already running, drain the queue.
fn schedule(batch: Vec<Callback>) {
    if batch.is_empty() {
        return;
    }

    let owns_flush = NOTIFY_QUEUE.with(|q| {
        let mut q = q.borrow_mut();
        q.batches.push_back(batch);
        if q.flushing {
            false
        } else {
            q.flushing = true;
            true
        }
    });
    if !owns_flush {
        return;
    }

    let _guard = FlushGuard;
    drain();
}

/// Run `f` with notification held back: batches scheduled inside it are
/// queued and delivered once `f` returns.
fn deferred<R>(f: impl FnOnce() -> R) -> R {
    let owns_flush = NOTIFY_QUEUE.with(|q| !std::mem::replace(&mut q.borrow_mut().flushing, true));
    if !owns_flush {
        return f();
    }

    let _guard = FlushGuard;
    let result = f();
    drain();
    result
}

fn drain() {
    while let Some(batch) = NOTIFY_QUEUE.with(|q| q.borrow_mut().batches.pop_front()) {
        for callback in batch {
            if let Err(err) = callback() {
                tracing::warn!(error = %err, "signal subscriber failed");
            }
        }
    }
}

// =============================================================================
// Signal
// =============================================================================

struct SignalInner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    subscribers: Rc<SubscriberList>,
}

/// A reactive mutable cell.
///
/// Cloning a `Signal` clones the handle; both handles share one value.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

/// Create a new signal.
pub fn signal<T: 'static>(value: T) -> Signal<T> {
    Signal::new(value)
}

impl<T: 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                version: Cell::new(0),
                subscribers: Rc::new(RefCell::new(Vec::new())),
            }),
        }
    }

    /// Borrow the value, subscribing the current tracking scope.
    ///
    /// Calling `set` on the same signal inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track_read();
        f(&self.inner.value.borrow())
    }

    /// Borrow the value without subscribing.
    pub fn with_peek<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store a new value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.changed();
    }

    /// Mutate the value in place and notify subscribers.
    ///
    /// Signals set inside `f` notify after the value is released.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        deferred(|| {
            f(&mut self.inner.value.borrow_mut());
            self.changed();
        });
    }

    /// Number of completed mutations.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }

    /// True if both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// A handle that does not keep the signal alive.
    pub fn downgrade(&self) -> WeakSignal<T> {
        WeakSignal {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn changed(&self) {
        self.inner.version.set(self.inner.version.get() + 1);
        let batch: Vec<Callback> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|s| s.callback.clone())
            .collect();
        schedule(batch);
    }

    fn track_read(&self) {
        let Some(observer) = observer::current() else {
            return;
        };
        let observer_id = observer.id();

        let already = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .any(|s| s.observer == Some(observer_id));
        if already {
            return;
        }

        let weak = observer.downgrade();
        let subscription = self.push_subscriber(
            Some(observer_id),
            Rc::new(move || {
                if let Some(observer) = weak.upgrade() {
                    observer.notify();
                }
                Ok(())
            }),
        );
        observer.add_source(subscription);
    }

    fn push_subscriber(&self, observer: Option<u64>, callback: Callback) -> Subscription {
        let id = next_id();
        self.inner.subscribers.borrow_mut().push(Subscriber {
            id,
            observer,
            callback,
        });
        Subscription {
            list: Rc::downgrade(&self.inner.subscribers),
            id,
        }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Read the value, subscribing the current tracking scope.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Read the value without subscribing.
    pub fn peek(&self) -> T {
        self.with_peek(T::clone)
    }

    /// Register an explicit callback, invoked with the value current at
    /// invocation time.
    pub fn subscribe(&self, f: impl Fn(&T) -> CallbackResult + 'static) -> Subscription {
        let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
        self.push_subscriber(
            None,
            Rc::new(move || match weak.upgrade() {
                Some(inner) => {
                    let value = inner.value.borrow().clone();
                    f(&value)
                }
                None => Ok(()),
            }),
        )
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// `set` that skips the store and notification when the value is unchanged.
    ///
    /// Returns true if the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        if *self.inner.value.borrow() == value {
            return false;
        }
        self.set(value);
        true
    }
}

/// Non-owning signal handle, for subscribers that refer back to signals
/// which hold them.
pub struct WeakSignal<T> {
    inner: Weak<SignalInner<T>>,
}

impl<T> WeakSignal<T> {
    pub fn upgrade(&self) -> Option<Signal<T>> {
        self.inner.upgrade().map(|inner| Signal { inner })
    }
}

impl<T> Clone for WeakSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Default + 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// =============================================================================
// Tests
// =============================================================================
