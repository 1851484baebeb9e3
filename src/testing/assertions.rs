//! Assertion functions for comparing slot sequences and plain collections.

use crate::node::{ItemBound, KeyBound};
use crate::slots::{Slot, SlotManager};
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

/// Assert that two collections are equal in order and content.
///
/// # Panics
/// Panics with a detailed message if the collections differ in length or
/// content.
///
/// # Example
/// ```
/// use slotline::testing::assert_collections_equal;
///
/// assert_collections_equal(&[1, 2, 3], &[1, 2, 3]);
/// ```
pub fn assert_collections_equal<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert_eq!(
            a, e,
            "Collection mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}\n  Full expected: {expected:?}\n  Full actual: {actual:?}"
        );
    }
}

/// Assert that two collections contain the same elements, ignoring order.
///
/// # Panics
/// Panics with the missing/extra elements if the contents differ.
pub fn assert_collections_unordered_equal<T: Debug + Eq + Hash>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Collection length mismatch:\n  Expected length: {}\n  Actual length: {}\n  Expected: {expected:?}\n  Actual: {actual:?}",
        expected.len(),
        actual.len()
    );
    let actual_set: HashSet<_> = actual.iter().collect();
    let expected_set: HashSet<_> = expected.iter().collect();
    if actual_set != expected_set {
        let missing: Vec<_> = expected_set.difference(&actual_set).collect();
        let extra: Vec<_> = actual_set.difference(&expected_set).collect();
        panic!(
            "Collection content mismatch:\n  Missing elements: {missing:?}\n  Extra elements: {extra:?}\n  Expected: {expected:?}\n  Actual: {actual:?}"
        );
    }
}

/// Compact rendering of a slot for shape assertions: headers become
/// `[label]`, items become the `Debug` form of their key.
#[must_use]
pub fn slot_label<T: ItemBound, K: KeyBound>(slot: &Slot<T, K>) -> String {
    match slot {
        Slot::Header(h) => format!("[{}]", h.label),
        Slot::Item(i) => format!("{:?}", i.key),
    }
}

/// Compact rendering of a whole slot sequence.
#[must_use]
pub fn slot_labels<T: ItemBound, K: KeyBound>(slots: &SlotManager<T, K>) -> Vec<String> {
    slots.slots().iter().map(slot_label).collect()
}

/// Assert that a slot manager's visible sequence matches the expected
/// compact labels (see [`slot_label`]).
///
/// # Panics
/// Panics with both sequences if they differ.
///
/// # Example
/// ```
/// use slotline::testing::*;
///
/// let engine = task_engine(vec![task(1, "a", "ops", 1)]);
/// assert_slot_labels(&engine.slots, &["[ops]", "[1]", "1"]);
/// ```
pub fn assert_slot_labels<T: ItemBound, K: KeyBound>(
    slots: &SlotManager<T, K>,
    expected: &[&str],
) {
    let actual = slot_labels(slots);
    let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
    assert_collections_equal(&actual, &expected);
}

/// Assert that the slot at `index` is a header with the given label, depth,
/// and counts.
///
/// # Panics
/// Panics if the slot is missing, is an item, or any field differs.
pub fn assert_header<T: ItemBound, K: KeyBound>(
    slots: &SlotManager<T, K>,
    index: usize,
    label: &str,
    depth: usize,
    item_count: usize,
    total_count: usize,
) {
    let slot = slots
        .get_slot(index)
        .unwrap_or_else(|| panic!("no slot at index {index}"));
    let Slot::Header(h) = slot else {
        panic!("slot {index} is an item, expected header [{label}]");
    };
    assert_eq!(h.label, label, "header label at {index}");
    assert_eq!(h.depth, depth, "header depth at {index} ([{label}])");
    assert_eq!(h.item_count, item_count, "item_count at {index} ([{label}])");
    assert_eq!(h.total_count, total_count, "total_count at {index} ([{label}])");
}

/// Assert that the slot at `index` is an item with the given key and depth.
///
/// # Panics
/// Panics if the slot is missing, is a header, or any field differs.
pub fn assert_item_slot<T: ItemBound, K: KeyBound>(
    slots: &SlotManager<T, K>,
    index: usize,
    key: &K,
    depth: usize,
) {
    let slot = slots
        .get_slot(index)
        .unwrap_or_else(|| panic!("no slot at index {index}"));
    let Slot::Item(i) = slot else {
        panic!("slot {index} is a header, expected item {key:?}");
    };
    assert_eq!(&i.key, key, "item key at {index}");
    assert_eq!(i.depth, depth, "item depth at {index} ({key:?})");
}

/// Assert that every element matches a predicate.
///
/// # Panics
/// Panics with the first offending element.
pub fn assert_all<T: Debug, F: Fn(&T) -> bool>(items: &[T], predicate: F) {
    for (i, item) in items.iter().enumerate() {
        assert!(predicate(item), "predicate failed at index {i}: {item:?}");
    }
}

/// Assert that at least one element matches a predicate.
///
/// # Panics
/// Panics if no element matches.
pub fn assert_any<T: Debug, F: Fn(&T) -> bool>(items: &[T], predicate: F) {
    assert!(
        items.iter().any(predicate),
        "no element matched the predicate in {items:?}"
    );
}

/// Assert that no element matches a predicate.
///
/// # Panics
/// Panics with the first matching element.
pub fn assert_none<T: Debug, F: Fn(&T) -> bool>(items: &[T], predicate: F) {
    for (i, item) in items.iter().enumerate() {
        assert!(!predicate(item), "predicate matched at index {i}: {item:?}");
    }
}
