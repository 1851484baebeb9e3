//! Flattening: from the projected tree to an index-addressable slot list.
//!
//! A [`SlotManager`] listens to a
//! [`CollectionController`](crate::CollectionController) and maintains a
//! linear sequence of [`Slot`]s suitable for virtualised scrolling. The
//! canonical flattening order is a pre-order walk of the projected tree
//! where, at every node, **group headers come first, then the node's direct
//! items**. For the tree `root → cat=A → {prio=1: [i1], prio=2: [i2]}`:
//!
//! ```text
//! Header(cat=A, depth 0)
//! Header(prio=1, depth 1)
//! Item(i1, depth 2)
//! Header(prio=2, depth 1)
//! Item(i2, depth 2)
//! ```
//!
//! An item's depth is its hosting header's depth + 1; items of an ungrouped
//! projection sit at depth 0.
//!
//! Collapse state lives *here*, keyed by each group's stable path id (the
//! `/`-joined node ids, e.g. `cat=A/prio=1`), so it survives controller
//! rebuilds. A collapsed group contributes only its header, whose
//! `total_count` still counts the hidden subtree.
//!
//! Slot indices are only valid until the next change event; consumers must
//! re-query after every notification.

use crate::controller::CollectionController;
use crate::emitter::{ChangeEmitter, ListenerHandle, Subscription};
use crate::node::{ItemBound, KeyBound, Node};
use crate::tristate::Tristate;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, Weak};

/// A group header slot: one renderable row introducing a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupHeader {
    /// Stable path id of the group (`cat=A/prio=1`).
    pub path: String,
    /// Id of the [`GroupOption`](crate::GroupOption) that produced the
    /// group.
    pub option_id: String,
    /// Display label (the group key).
    pub label: String,
    /// Nesting depth; top-level groups are at 0.
    pub depth: usize,
    /// Direct items in the group (descendant groups not counted).
    pub item_count: usize,
    /// Items in the whole subtree, counted per appearance, collapsed or not.
    pub total_count: usize,
}

/// An item slot: one renderable row holding an item appearance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemSlot<T, K> {
    /// The item's key (shared across multi-group appearances).
    pub key: K,
    /// The item handle.
    pub item: T,
    /// Nesting depth of the hosting group (0 for root-level items).
    pub depth: usize,
}

/// A renderable unit of the flattened projection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Slot<T, K> {
    /// A group header row.
    Header(GroupHeader),
    /// An item row.
    Item(ItemSlot<T, K>),
}

impl<T, K> Slot<T, K> {
    /// True for header slots.
    #[must_use]
    pub const fn is_header(&self) -> bool {
        matches!(self, Self::Header(_))
    }

    /// The header, for header slots.
    #[must_use]
    pub const fn as_header(&self) -> Option<&GroupHeader> {
        match self {
            Self::Header(h) => Some(h),
            Self::Item(_) => None,
        }
    }

    /// The item slot, for item slots.
    #[must_use]
    pub const fn as_item(&self) -> Option<&ItemSlot<T, K>> {
        match self {
            Self::Header(_) => None,
            Self::Item(i) => Some(i),
        }
    }
}

struct SlotInner<T, K> {
    controller: CollectionController<T, K>,
    collapsed: BTreeSet<String>,
    slots: Vec<Slot<T, K>>,
    all_groups: Vec<GroupHeader>,
    unique_items: usize,
    sub: Option<Subscription>,
}

/// Maintains the flattened slot sequence for a controller's projection.
///
/// # Example
/// ```
/// use slotline::{CollectionController, GroupManager, GroupOption, SlotManager};
///
/// #[derive(Clone)]
/// struct Row { id: u32, shelf: String }
///
/// let groups = GroupManager::new();
/// groups.add(GroupOption::single("shelf", |r: &Row| Some(r.shelf.clone())));
/// let controller = CollectionController::new(|r: &Row| r.id).with_groups(groups);
/// let slots = SlotManager::new(&controller);
///
/// controller.add(Row { id: 1, shelf: "a".into() }).unwrap();
/// assert_eq!(slots.total_slots(), 2); // header + item
/// assert!(slots.is_header(0));
///
/// slots.collapse("shelf=a");
/// assert_eq!(slots.total_slots(), 1); // header only
/// ```
pub struct SlotManager<T, K> {
    inner: Arc<Mutex<SlotInner<T, K>>>,
    emitter: ChangeEmitter,
}

impl<T, K> Clone for SlotManager<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: ItemBound, K: KeyBound> SlotManager<T, K> {
    /// Create a manager over a controller's projection and subscribe to its
    /// changes.
    #[must_use]
    pub fn new(controller: &CollectionController<T, K>) -> Self {
        let manager = Self {
            inner: Arc::new(Mutex::new(SlotInner {
                controller: controller.clone(),
                collapsed: BTreeSet::new(),
                slots: Vec::new(),
                all_groups: Vec::new(),
                unique_items: 0,
                sub: None,
            })),
            emitter: ChangeEmitter::new(),
        };

        let weak = Arc::downgrade(&manager.inner);
        let emitter = manager.emitter.clone();
        let handle = controller.emitter().add_listener(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                reflatten(&inner);
                emitter.notify();
            }
        });
        manager.inner.lock().unwrap().sub = Some(Subscription::new(
            controller.emitter().clone(),
            handle,
        ));

        reflatten(&manager.inner);
        manager
    }

    /// The controller this manager flattens.
    #[must_use]
    pub fn controller(&self) -> CollectionController<T, K> {
        self.inner.lock().unwrap().controller.clone()
    }

    // |---------|
    // | Queries |
    // |---------|

    /// Number of currently visible slots (headers + item appearances;
    /// collapsed subtrees contribute only their header).
    #[must_use]
    pub fn total_slots(&self) -> usize {
        self.inner.lock().unwrap().slots.len()
    }

    /// Number of distinct item keys in the projection, collapsed or not.
    /// Multi-grouped items count once.
    #[must_use]
    pub fn unique_item_count(&self) -> usize {
        self.inner.lock().unwrap().unique_items
    }

    /// True if no slots are visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().slots.is_empty()
    }

    /// True if the slot at `index` is a group header.
    #[must_use]
    pub fn is_header(&self, index: usize) -> bool {
        self.inner
            .lock()
            .unwrap()
            .slots
            .get(index)
            .is_some_and(Slot::is_header)
    }

    /// The slot at `index`, if in range.
    #[must_use]
    pub fn get_slot(&self, index: usize) -> Option<Slot<T, K>> {
        self.inner.lock().unwrap().slots.get(index).cloned()
    }

    /// The header at `index`, if that slot is a header.
    #[must_use]
    pub fn header_at(&self, index: usize) -> Option<GroupHeader> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .get(index)
            .and_then(|s| s.as_header().cloned())
    }

    /// Snapshot of the visible slot sequence.
    #[must_use]
    pub fn slots(&self) -> Vec<Slot<T, K>> {
        self.inner.lock().unwrap().slots.clone()
    }

    /// Headers of every group in the projection (visible or hidden), in
    /// pre-order.
    #[must_use]
    pub fn group_headers(&self) -> Vec<GroupHeader> {
        self.inner.lock().unwrap().all_groups.clone()
    }

    /// The currently visible headers, in slot order.
    #[must_use]
    pub fn visible_headers(&self) -> Vec<GroupHeader> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .iter()
            .filter_map(|s| s.as_header().cloned())
            .collect()
    }

    /// Index of the first visible item slot holding `key`, if any.
    ///
    /// With multi-valued grouping the same key can occupy several slots;
    /// this returns the earliest. Like every index, the result is only valid
    /// until the next change event.
    #[must_use]
    pub fn index_of_key(&self, key: &K) -> Option<usize> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .iter()
            .position(|s| s.as_item().is_some_and(|i| i.key == *key))
    }

    // |----------|
    // | Collapse |
    // |----------|

    /// True if the group at `path` is collapsed.
    #[must_use]
    pub fn is_collapsed(&self, path: &str) -> bool {
        self.inner.lock().unwrap().collapsed.contains(path)
    }

    /// Flip the collapse state of one group.
    pub fn toggle_collapse(&self, path: &str) {
        {
            let mut g = self.inner.lock().unwrap();
            if !g.collapsed.remove(path) {
                g.collapsed.insert(path.to_string());
            }
        }
        self.after_collapse_change();
    }

    /// Collapse one group. No-op if already collapsed.
    pub fn collapse(&self, path: &str) {
        let changed = self.inner.lock().unwrap().collapsed.insert(path.to_string());
        if changed {
            self.after_collapse_change();
        }
    }

    /// Expand one group. No-op if not collapsed.
    pub fn expand(&self, path: &str) {
        let changed = self.inner.lock().unwrap().collapsed.remove(path);
        if changed {
            self.after_collapse_change();
        }
    }

    /// Expand every group.
    pub fn expand_all(&self) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            let had = !g.collapsed.is_empty();
            g.collapsed.clear();
            had
        };
        if changed {
            self.after_collapse_change();
        }
    }

    /// Collapse every group in the projection.
    pub fn collapse_all(&self) {
        {
            let mut g = self.inner.lock().unwrap();
            g.collapsed = g.all_groups.iter().map(|h| h.path.clone()).collect();
        }
        self.after_collapse_change();
    }

    /// Collapse every group at depth ≥ `level` and expand the rest.
    /// `collapse_to_level(0)` equals [`collapse_all`](Self::collapse_all);
    /// a level beyond the tree height equals
    /// [`expand_all`](Self::expand_all).
    pub fn collapse_to_level(&self, level: usize) {
        {
            let mut g = self.inner.lock().unwrap();
            g.collapsed = g
                .all_groups
                .iter()
                .filter(|h| h.depth >= level)
                .map(|h| h.path.clone())
                .collect();
        }
        self.after_collapse_change();
    }

    /// Collapse every group the predicate selects; other groups keep their
    /// current state.
    pub fn collapse_where<F>(&self, predicate: F)
    where
        F: Fn(&GroupHeader) -> bool,
    {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            let matching: Vec<String> = g
                .all_groups
                .iter()
                .filter(|h| predicate(h))
                .map(|h| h.path.clone())
                .collect();
            let mut any = false;
            for path in matching {
                any |= g.collapsed.insert(path);
            }
            any
        };
        if changed {
            self.after_collapse_change();
        }
    }

    /// Aggregate collapse state of a group: `Yes` if collapsed itself,
    /// `Mixed` if expanded but holding a collapsed descendant group, `No`
    /// otherwise.
    #[must_use]
    pub fn collapse_state(&self, path: &str) -> Tristate {
        let g = self.inner.lock().unwrap();
        if g.collapsed.contains(path) {
            return Tristate::Yes;
        }
        let prefix = format!("{path}/");
        let mixed = g
            .all_groups
            .iter()
            .any(|h| h.path.starts_with(&prefix) && g.collapsed.contains(&h.path));
        if mixed { Tristate::Mixed } else { Tristate::No }
    }

    fn after_collapse_change(&self) {
        reflatten(&self.inner);
        self.emitter.notify();
    }

    // |-----------|
    // | Selection |
    // |-----------|

    /// Aggregate selection state of every distinct item key under a group,
    /// through the controller's selection manager (default scope).
    ///
    /// Returns [`Tristate::No`] when the path is unknown, the group is
    /// empty, or no selection manager is attached.
    #[must_use]
    pub fn selection_state(&self, path: &str) -> Tristate {
        let (controller, keys) = {
            let g = self.inner.lock().unwrap();
            let Some(node) = find_by_path(&g.controller.root(), path) else {
                return Tristate::No;
            };
            (g.controller.clone(), distinct_keys(&node))
        };
        match controller.selection() {
            Some(selection) if !keys.is_empty() => selection.state_of(&keys),
            _ => Tristate::No,
        }
    }

    /// Select or deselect every distinct item key under a group (default
    /// scope). One notification on the selection manager.
    pub fn select_group(&self, path: &str, selected: bool) {
        let (controller, keys) = {
            let g = self.inner.lock().unwrap();
            let Some(node) = find_by_path(&g.controller.root(), path) else {
                return;
            };
            (g.controller.clone(), distinct_keys(&node))
        };
        if let Some(selection) = controller.selection() {
            if selected {
                selection.select_all(keys);
            } else {
                selection.deselect_all(keys.iter());
            }
        }
    }

    /// Register a change listener; fires whenever the slot sequence may have
    /// changed (rebuilds and collapse changes).
    pub fn add_listener<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.emitter.add_listener(f)
    }

    /// Remove a change listener.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.emitter.remove_listener(handle)
    }

    /// Unsubscribe from the controller and drop all listeners. The
    /// controller itself is untouched.
    pub fn dispose(&self) {
        let sub = self.inner.lock().unwrap().sub.take();
        if let Some(sub) = sub {
            sub.unsubscribe();
        }
        self.emitter.dispose();
    }
}

/// Recompute the slot sequence from the controller's current projection.
fn reflatten<T: ItemBound, K: KeyBound>(inner: &Arc<Mutex<SlotInner<T, K>>>) {
    let (root, collapsed) = {
        let g = inner.lock().unwrap();
        (g.controller.root(), g.collapsed.clone())
    };

    let mut slots = Vec::new();
    let mut all_groups = Vec::new();
    let mut seen: HashSet<K> = HashSet::new();
    walk(&root, "", 0, true, &collapsed, &mut slots, &mut all_groups, &mut seen);

    let mut g = inner.lock().unwrap();
    g.slots = slots;
    g.all_groups = all_groups;
    g.unique_items = seen.len();
}

/// Pre-order walk emitting headers first, then the node's direct items.
#[allow(clippy::too_many_arguments)]
fn walk<T: ItemBound, K: KeyBound>(
    node: &Node<T, K>,
    prefix: &str,
    depth: usize,
    visible: bool,
    collapsed: &BTreeSet<String>,
    slots: &mut Vec<Slot<T, K>>,
    all_groups: &mut Vec<GroupHeader>,
    seen: &mut HashSet<K>,
) {
    for child in node.children() {
        let id = child.id();
        let path = if prefix.is_empty() {
            id.clone()
        } else {
            format!("{prefix}/{id}")
        };
        let tag = child.group_tag();
        let header = GroupHeader {
            path: path.clone(),
            option_id: tag.as_ref().map(|t| t.option_id.clone()).unwrap_or_default(),
            label: tag.map_or(id, |t| t.key),
            depth,
            item_count: child.len(),
            total_count: child.flattened_len(),
        };
        all_groups.push(header.clone());
        if visible {
            slots.push(Slot::Header(header));
        }
        let child_visible = visible && !collapsed.contains(&path);
        walk(
            &child,
            &path,
            depth + 1,
            child_visible,
            collapsed,
            slots,
            all_groups,
            seen,
        );
    }
    for (key, item) in node.items() {
        seen.insert(key.clone());
        if visible {
            slots.push(Slot::Item(ItemSlot { key, item, depth }));
        }
    }
}

/// Resolve a group path against the projected tree by longest-prefix
/// descent (robust against `/` inside group keys).
fn find_by_path<T: ItemBound, K: KeyBound>(root: &Node<T, K>, path: &str) -> Option<Node<T, K>> {
    fn descend<T: ItemBound, K: KeyBound>(
        node: &Node<T, K>,
        prefix: &str,
        target: &str,
    ) -> Option<Node<T, K>> {
        for child in node.children() {
            let child_path = if prefix.is_empty() {
                child.id()
            } else {
                format!("{prefix}/{}", child.id())
            };
            if child_path == target {
                return Some(child);
            }
            if target.starts_with(&format!("{child_path}/")) {
                if let Some(found) = descend(&child, &child_path, target) {
                    return Some(found);
                }
            }
        }
        None
    }
    descend(root, "", path)
}

/// Distinct item keys in a subtree, in first-appearance order.
fn distinct_keys<T: ItemBound, K: KeyBound>(node: &Node<T, K>) -> Vec<K> {
    let mut seen = HashSet::new();
    node.flattened_items()
        .into_iter()
        .map(|(k, _)| k)
        .filter(|k| seen.insert(k.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_accessors() {
        let header: Slot<u8, u8> = Slot::Header(GroupHeader {
            path: "g=1".to_string(),
            option_id: "g".to_string(),
            label: "1".to_string(),
            depth: 0,
            item_count: 1,
            total_count: 2,
        });
        assert!(header.is_header());
        assert_eq!(header.as_header().unwrap().label, "1");
        assert!(header.as_item().is_none());

        let item: Slot<u8, u8> = Slot::Item(ItemSlot {
            key: 9,
            item: 9,
            depth: 1,
        });
        assert!(!item.is_header());
        assert!(item.as_header().is_none());
        assert_eq!(item.as_item().unwrap().key, 9);
    }
}
