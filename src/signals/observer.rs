//! Observers - tracking scopes for automatic dependency discovery.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::{next_id, Subscription};

thread_local! {
    /// `None` entries come from `untrack` and hide outer scopes.
    static TRACKING: RefCell<Vec<Option<Observer>>> = const { RefCell::new(Vec::new()) };
}

struct ObserverInner {
    id: u64,
    dirty: Cell<bool>,
    sources: RefCell<Vec<Subscription>>,
    on_change: Option<Rc<dyn Fn()>>,
}

impl Drop for ObserverInner {
    fn drop(&mut self) {
        for source in self.sources.get_mut().drain(..) {
            source.cancel();
        }
    }
}

/// A tracking scope.
///
/// Signals read with `get` inside [`track`] register the observer as a
/// subscriber. When any of them changes the observer turns dirty and its
/// change callback (if any) runs.
#[derive(Clone)]
pub struct Observer {
    inner: Rc<ObserverInner>,
}

pub(crate) struct WeakObserver {
    inner: Weak<ObserverInner>,
}

impl WeakObserver {
    pub(crate) fn upgrade(&self) -> Option<Observer> {
        self.inner.upgrade().map(|inner| Observer { inner })
    }
}

impl Observer {
    /// A new observer. Starts dirty so its first run always happens.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Observer that also runs `f` each time a dependency changes.
    pub fn with_callback(f: impl Fn() + 'static) -> Self {
        Self::build(Some(Rc::new(f)))
    }

    fn build(on_change: Option<Rc<dyn Fn()>>) -> Self {
        Self {
            inner: Rc::new(ObserverInner {
                id: next_id(),
                dirty: Cell::new(true),
                sources: RefCell::new(Vec::new()),
                on_change,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Force the next check to see this observer as dirty.
    pub fn invalidate(&self) {
        self.inner.dirty.set(true);
    }

    /// Number of signals currently tracked.
    pub fn dependency_count(&self) -> usize {
        self.inner.sources.borrow().len()
    }

    /// Drop every tracked dependency.
    pub fn clear_dependencies(&self) {
        let sources = std::mem::take(&mut *self.inner.sources.borrow_mut());
        for source in sources {
            source.cancel();
        }
    }

    pub(crate) fn notify(&self) {
        self.inner.dirty.set(true);
        if let Some(on_change) = self.inner.on_change.clone() {
            on_change();
        }
    }

    pub(crate) fn add_source(&self, subscription: Subscription) {
        self.inner.sources.borrow_mut().push(subscription);
    }

    pub(crate) fn downgrade(&self) -> WeakObserver {
        WeakObserver {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Default for Observer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.inner.id)
            .field("dirty", &self.inner.dirty.get())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}

// =============================================================================
// Tracking Stack
// =============================================================================

/// Pops the tracking stack even if the tracked closure panics.
struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        TRACKING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub(crate) fn current() -> Option<Observer> {
    TRACKING.with(|stack| stack.borrow().last().cloned().flatten())
}

/// Run `f` with `observer` as the current tracking scope.
///
/// Previous dependencies are dropped first and the observer is marked clean,
/// so the set of dependencies always reflects the latest run.
pub fn track<R>(observer: &Observer, f: impl FnOnce() -> R) -> R {
    observer.clear_dependencies();
    observer.inner.dirty.set(false);
    TRACKING.with(|stack| stack.borrow_mut().push(Some(observer.clone())));
    let _guard = ScopeGuard;
    f()
}

/// Run `f` with tracking suspended.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    TRACKING.with(|stack| stack.borrow_mut().push(None));
    let _guard = ScopeGuard;
    f()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::signal;

    #[test]
    fn test_get_tracks_peek_does_not() {
        let tracked = signal(1);
        let peeked = signal(2);
        let observer = Observer::new();

        track(&observer, || {
            tracked.get();
            peeked.peek();
        });
        assert!(!observer.is_dirty());
        assert_eq!(observer.dependency_count(), 1);

        peeked.set(3);
        assert!(!observer.is_dirty());

        tracked.set(4);
        assert!(observer.is_dirty());
    }

    #[test]
    fn test_repeated_reads_subscribe_once() {
        let s = signal(0);
        let observer = Observer::new();
        track(&observer, || {
            s.get();
            s.get();
            s.with(|_| ());
        });
        assert_eq!(s.subscriber_count(), 1);
    }

    #[test]
    fn test_retrack_rediscovers_dependencies() {
        let flag = signal(true);
        let a = signal(1);
        let b = signal(2);
        let observer = Observer::new();

        let run = || {
            track(&observer, || if flag.get() { a.get() } else { b.get() });
        };

        run();
        assert_eq!(a.subscriber_count(), 1);
        assert_eq!(b.subscriber_count(), 0);

        flag.set(false);
        run();
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 1);
    }

    #[test]
    fn test_untrack_hides_scope() {
        let s = signal(0);
        let observer = Observer::new();
        track(&observer, || untrack(|| s.get()));
        assert_eq!(observer.dependency_count(), 0);
    }

    #[test]
    fn test_callback_fires_on_change() {
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        let observer = Observer::with_callback(move || hits_clone.set(hits_clone.get() + 1));
        let s = signal(0);
        track(&observer, || s.get());
        s.set(1);
        s.set(2);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_dropped_observer_unsubscribes() {
        let s = signal(0);
        {
            let observer = Observer::new();
            track(&observer, || s.get());
            assert_eq!(s.subscriber_count(), 1);
        }
        assert_eq!(s.subscriber_count(), 0);
    }
}
