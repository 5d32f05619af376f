//! Property-based invariant tests.
//!
//! 1. Every subscriber runs exactly once per set made after it was
//!    registered (between sets or from inside a callback) and sees the
//!    final value
//! 2. Paint order covers every attached component exactly once
//! 3. Paint order is sorted by z-index, ties in pre-order
//! 4. Paint order is deterministic across calls
//! 5. The decoder never panics, always drains on flush, and chunking does
//!    not change its output

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use ember_tui::input::Decoder;
use ember_tui::{signal, Component, ComponentId, ComponentTree, Rect, Signal, Text};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────

/// Builds a tree from (parent pick, z-index) pairs. Each new component's
/// parent is chosen among the ones created before it (root included).
fn build_tree(spec: &[(usize, i8)]) -> (ComponentTree, Vec<ComponentId>) {
    let mut tree = ComponentTree::new(40, 20);
    let mut ids = vec![tree.root()];
    for (pick, z) in spec {
        let parent = ids[pick % ids.len()];
        let id = tree
            .add(
                parent,
                Component::new(Text::new("x"))
                    .rect(Rect::new(0, 0, 4, 1))
                    .z_index(i32::from(*z)),
            )
            .unwrap();
        ids.push(id);
    }
    (tree, ids)
}

fn arb_tree_spec() -> impl Strategy<Value = Vec<(usize, i8)>> {
    proptest::collection::vec((any::<usize>(), -3i8..=3), 0..40)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Subscriber notification counts
// ═════════════════════════════════════════════════════════════════════════

/// Subscribers are registered between sets; a nested one registers another
/// subscriber from inside its first callback.
#[derive(Debug, Clone)]
enum Op {
    Subscribe,
    SubscribeNested,
    Set(i32),
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            2 => Just(Op::Subscribe),
            1 => Just(Op::SubscribeNested),
            4 => any::<i32>().prop_map(Op::Set),
        ],
        1..40,
    )
}

struct Counter {
    calls: Rc<Cell<usize>>,
    last: Rc<Cell<Option<i32>>>,
    registered_at: u64,
}

type Counters = Rc<RefCell<Vec<Counter>>>;

fn register(s: &Signal<i32>, counters: &Counters, nested: bool) {
    let calls = Rc::new(Cell::new(0));
    let last = Rc::new(Cell::new(None));
    counters.borrow_mut().push(Counter {
        calls: calls.clone(),
        last: last.clone(),
        registered_at: s.version(),
    });

    let signal = s.clone();
    let counters = counters.clone();
    s.subscribe(move |v| {
        calls.set(calls.get() + 1);
        last.set(Some(*v));
        if nested && calls.get() == 1 {
            register(&signal, &counters, false);
        }
        Ok(())
    });
}

proptest! {
    #[test]
    fn subscribers_called_once_per_set_after_registration(ops in arb_ops()) {
        let s = signal(0i32);
        let counters: Counters = Rc::default();
        let mut sets = 0u64;
        let mut last_value = None;

        for op in &ops {
            match op {
                Op::Subscribe => register(&s, &counters, false),
                Op::SubscribeNested => register(&s, &counters, true),
                Op::Set(v) => {
                    s.set(*v);
                    sets += 1;
                    last_value = Some(*v);
                }
            }
        }

        prop_assert_eq!(s.version(), sets);
        for counter in counters.borrow().iter() {
            // A subscriber added during a set only sees the sets after it.
            let expected = (sets - counter.registered_at) as usize;
            prop_assert_eq!(counter.calls.get(), expected);
            if expected > 0 {
                prop_assert_eq!(counter.last.get(), last_value);
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Paint order is total
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn paint_order_is_total(spec in arb_tree_spec()) {
        let (tree, ids) = build_tree(&spec);
        let mut order: Vec<ComponentId> = tree.paint_order().collect();
        prop_assert_eq!(order.len(), ids.len());
        order.sort();
        order.dedup();
        prop_assert_eq!(order.len(), ids.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Sorted by z, ties in pre-order
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn paint_order_sorted_by_z_then_pre_order(spec in arb_tree_spec()) {
        let (tree, _) = build_tree(&spec);
        let pre_order = tree.pre_order();
        let position = |id: ComponentId| pre_order.iter().position(|p| *p == id).unwrap();

        let order: Vec<ComponentId> = tree.paint_order().collect();
        for pair in order.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (za, zb) = (tree.z_index(a).unwrap(), tree.z_index(b).unwrap());
            prop_assert!(za <= zb);
            if za == zb {
                prop_assert!(position(a) < position(b));
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Deterministic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn paint_order_is_stable(spec in arb_tree_spec()) {
        let (tree, _) = build_tree(&spec);
        let first: Vec<ComponentId> = tree.paint_order().collect();
        let second: Vec<ComponentId> = tree.paint_order().collect();
        prop_assert_eq!(first, second);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Decoder robustness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn decoder_never_panics(bytes in proptest::collection::vec(any::<u8>(), 0..=300)) {
        let mut decoder = Decoder::new(Duration::from_millis(10));
        let now = Instant::now();
        let _ = decoder.feed(&bytes, now);
        let _ = decoder.flush_expired(now + Duration::from_secs(1));
        let _ = decoder.flush();
        prop_assert!(!decoder.has_pending());
        prop_assert!(decoder.deadline().is_none());
    }

    #[test]
    fn chunking_does_not_change_printable_input(
        text in "[a-zA-Z0-9 ]{0,40}",
        split in any::<usize>(),
    ) {
        let bytes = text.as_bytes();
        let cut = if bytes.is_empty() { 0 } else { split % (bytes.len() + 1) };
        let now = Instant::now();

        let mut whole = Decoder::new(Duration::from_millis(10));
        let expected = whole.feed(bytes, now);

        let mut chunked = Decoder::new(Duration::from_millis(10));
        let mut actual = chunked.feed(&bytes[..cut], now);
        actual.extend(chunked.feed(&bytes[cut..], now));

        prop_assert_eq!(actual, expected);
    }
}
