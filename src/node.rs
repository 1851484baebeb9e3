//! The hierarchical item container the projection is made of.
//!
//! A [`Node`] is a tree vertex that owns an insertion-ordered, keyed set of
//! items and an insertion-ordered set of child nodes. The
//! [`CollectionController`](crate::CollectionController) builds a fresh tree
//! of nodes on every rebuild; the [`SlotManager`](crate::SlotManager)
//! flattens that tree into a linear slot sequence.
//!
//! # Handles
//!
//! `Node` is a cheaply cloneable handle (`Arc<Mutex<_>>` inside); clones
//! refer to the same vertex. Parent links are weak: ownership flows strictly
//! parent → child, and detaching a subtree drops it once the last external
//! handle goes away. [`deep_clone`](Node::deep_clone) produces an isomorphic
//! copy with fresh identity.
//!
//! # Invariants
//!
//! - item keys are unique within a node ([`Error::DuplicateKey`]),
//! - child ids are unique within a node,
//! - a node is never its own ancestor ([`Error::CycleDetected`]),
//! - an attached node appears in exactly one parent's children,
//! - `key_of` must be stable for the lifetime of an item within a node.

use crate::error::{Error, Result};
use crate::tristate::Tristate;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, Weak};

/// The standard bound for items carried by a node tree.
///
/// Handles are shared freely across manager callbacks, so items must be
/// `'static`, thread-mobile, and cloneable. Multi-valued grouping places the
/// *same* item under several groups by cloning; wrap heavy payloads in `Arc`
/// to make that clone a pointer bump.
pub trait ItemBound: 'static + Send + Sync + Clone {}
impl<T> ItemBound for T where T: 'static + Send + Sync + Clone {}

/// The standard bound for item keys.
///
/// Keys additionally need equality, hashing (for the ordered key→index map)
/// and a `Debug` rendering (for error messages).
pub trait KeyBound: ItemBound + Eq + Hash + Debug {}
impl<K> KeyBound for K where K: ItemBound + Eq + Hash + Debug {}

/// Shared key-extraction callback for a tree.
///
/// Every node in the same tree uses the same extractor; the engine may call
/// it many times per item per rebuild, so it must be pure and cheap.
pub type KeyOf<T, K> = Arc<dyn Fn(&T) -> K + Send + Sync>;

/// Traversal order for [`Node::descendants`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Traversal {
    /// Level by level (the default).
    #[default]
    BreadthFirst,
    /// Pre-order, children before siblings.
    DepthFirst,
}

/// Metadata attached to a projected group node: which grouping option
/// produced it and under which key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupTag {
    /// Id of the [`GroupOption`](crate::GroupOption) that produced the node.
    pub option_id: String,
    /// The group key at this level (also the default header label).
    pub key: String,
}

struct NodeInner<T, K> {
    id: String,
    items: IndexMap<K, T>,
    children: IndexMap<String, Node<T, K>>,
    parent: Weak<Mutex<NodeInner<T, K>>>,
    collapsed: Tristate,
    tag: Option<GroupTag>,
    key_of: KeyOf<T, K>,
}

/// A tree vertex owning ordered keyed items and ordered child nodes.
///
/// # Example
/// ```
/// use slotline::Node;
///
/// let node: Node<&str, String> = Node::with_key_fn("root", |s: &&str| s.to_string());
/// node.add("alpha").unwrap();
/// node.add("beta").unwrap();
///
/// assert_eq!(node.len(), 2);
/// assert_eq!(node.at(1), Some("beta"));
/// assert!(node.add("alpha").is_err()); // duplicate key
/// ```
pub struct Node<T, K> {
    inner: Arc<Mutex<NodeInner<T, K>>>,
}

impl<T, K> Clone for Node<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ItemBound, K: KeyBound> Debug for Node<T, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = self.inner.lock().unwrap();
        f.debug_struct("Node")
            .field("id", &g.id)
            .field("items", &g.items.len())
            .field("children", &g.children.len())
            .field("collapsed", &g.collapsed)
            .finish()
    }
}

impl<T: ItemBound, K: KeyBound> Node<T, K> {
    /// Create a detached node with the given id and key extractor.
    #[must_use]
    pub fn new(id: impl Into<String>, key_of: KeyOf<T, K>) -> Self {
        Self::build(id.into(), key_of, None)
    }

    /// Create a detached node from a plain closure.
    #[must_use]
    pub fn with_key_fn<F>(id: impl Into<String>, key_of: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::new(id, Arc::new(key_of))
    }

    pub(crate) fn with_tag(id: impl Into<String>, key_of: KeyOf<T, K>, tag: GroupTag) -> Self {
        Self::build(id.into(), key_of, Some(tag))
    }

    fn build(id: String, key_of: KeyOf<T, K>, tag: Option<GroupTag>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(NodeInner {
                id,
                items: IndexMap::new(),
                children: IndexMap::new(),
                parent: Weak::new(),
                collapsed: Tristate::No,
                tag,
                key_of,
            })),
        }
    }

    /// The node's id, unique among its siblings.
    #[must_use]
    pub fn id(&self) -> String {
        self.inner.lock().unwrap().id.clone()
    }

    /// Grouping metadata, present on projected group nodes.
    #[must_use]
    pub fn group_tag(&self) -> Option<GroupTag> {
        self.inner.lock().unwrap().tag.clone()
    }

    /// Apply the tree's key extractor to an item.
    #[must_use]
    pub fn key_of(&self, item: &T) -> K {
        let key_of = Arc::clone(&self.inner.lock().unwrap().key_of);
        key_of(item)
    }

    /// True if `self` and `other` are handles to the same vertex.
    #[must_use]
    pub fn same_node(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // |-----------|
    // | Item ops  |
    // |-----------|

    /// Append an item.
    ///
    /// # Errors
    /// [`Error::DuplicateKey`] if an item with the same key is present.
    pub fn add(&self, item: T) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let key = (g.key_of)(&item);
        if g.items.contains_key(&key) {
            return Err(Error::DuplicateKey {
                node: g.id.clone(),
                key: format!("{key:?}"),
            });
        }
        g.items.insert(key, item);
        Ok(())
    }

    /// Append every item in order.
    ///
    /// # Errors
    /// Stops at the first [`Error::DuplicateKey`]; items appended before the
    /// duplicate stay in place.
    pub fn add_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<()> {
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }

    /// Insert an item at `index` (clamped to the current length), shifting
    /// later items.
    ///
    /// # Errors
    /// [`Error::DuplicateKey`] if an item with the same key is present.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        let mut g = self.inner.lock().unwrap();
        let key = (g.key_of)(&item);
        if g.items.contains_key(&key) {
            return Err(Error::DuplicateKey {
                node: g.id.clone(),
                key: format!("{key:?}"),
            });
        }
        let index = index.min(g.items.len());
        g.items.shift_insert(index, key, item);
        Ok(())
    }

    /// Remove the item with the same key as `item`, preserving the order of
    /// the rest. Returns the removed item.
    pub fn remove(&self, item: &T) -> Option<T> {
        let key = self.key_of(item);
        self.remove_by_key(&key)
    }

    /// Remove the item under `key`, preserving the order of the rest.
    pub fn remove_by_key(&self, key: &K) -> Option<T> {
        self.inner.lock().unwrap().items.shift_remove(key)
    }

    /// Replace the item under `key`, keeping its position. The replacement's
    /// own key may differ from `key`; the slot is re-keyed accordingly.
    ///
    /// Returns the previous item.
    ///
    /// # Errors
    /// [`Error::NotFound`] if `key` is absent; [`Error::DuplicateKey`] if
    /// re-keying would collide with another item.
    pub fn replace_by_key(&self, key: &K, item: T) -> Result<T> {
        let mut g = self.inner.lock().unwrap();
        let new_key = (g.key_of)(&item);
        let Some(index) = g.items.get_index_of(key) else {
            return Err(Error::NotFound {
                what: "item",
                id: format!("{key:?}"),
            });
        };
        if new_key == *key {
            let slot = g.items.get_index_mut(index).map(|(_, v)| v);
            // Index was just looked up; the entry is present.
            let slot = slot.ok_or_else(|| Error::NotFound {
                what: "item",
                id: format!("{key:?}"),
            })?;
            return Ok(std::mem::replace(slot, item));
        }
        if g.items.contains_key(&new_key) {
            return Err(Error::DuplicateKey {
                node: g.id.clone(),
                key: format!("{new_key:?}"),
            });
        }
        let (_, old) = g.items.shift_remove_index(index).ok_or(Error::NotFound {
            what: "item",
            id: format!("{key:?}"),
        })?;
        g.items.shift_insert(index, new_key, item);
        Ok(old)
    }

    /// Remove every item. Children are untouched.
    pub fn clear(&self) {
        self.inner.lock().unwrap().items.clear();
    }

    /// The item under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<T> {
        self.inner.lock().unwrap().items.get(key).cloned()
    }

    /// The item at position `index`, if in range.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<T> {
        self.inner
            .lock()
            .unwrap()
            .items
            .get_index(index)
            .map(|(_, v)| v.clone())
    }

    /// Position of the item with the same key as `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        let key = self.key_of(item);
        self.index_of_key(&key)
    }

    /// Position of the item under `key`. O(1).
    #[must_use]
    pub fn index_of_key(&self, key: &K) -> Option<usize> {
        self.inner.lock().unwrap().items.get_index_of(key)
    }

    /// True if an item under `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().unwrap().items.contains_key(key)
    }

    /// Number of direct items (children not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    /// True if the node has neither items nor children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let g = self.inner.lock().unwrap();
        g.items.is_empty() && g.children.is_empty()
    }

    /// Snapshot of the direct items in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<(K, T)> {
        self.inner
            .lock()
            .unwrap()
            .items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Snapshot of the direct item keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().unwrap().items.keys().cloned().collect()
    }

    /// Stable-sort the direct items. Children are untouched.
    pub fn sort<F>(&self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        self.inner
            .lock()
            .unwrap()
            .items
            .sort_by(|_, a, _, b| cmp(a, b));
    }

    // |-----------|
    // | Tree ops  |
    // |-----------|

    /// Attach `child` as the last child.
    ///
    /// A child currently attached elsewhere is detached first (move
    /// semantics).
    ///
    /// # Errors
    /// [`Error::CycleDetected`] if `child` is this node or one of its
    /// ancestors; [`Error::DuplicateKey`] if a different child with the same
    /// id is already attached.
    pub fn add_child(&self, child: &Self) -> Result<()> {
        if self.same_node(child) || child.is_ancestor_of(self) {
            return Err(Error::CycleDetected {
                node: self.id(),
                would_be_child: child.id(),
            });
        }
        let child_id = child.id();
        {
            let g = self.inner.lock().unwrap();
            if let Some(existing) = g.children.get(&child_id) {
                if existing.same_node(child) {
                    return Ok(());
                }
                return Err(Error::DuplicateKey {
                    node: g.id.clone(),
                    key: child_id,
                });
            }
        }
        if let Some(old_parent) = child.parent() {
            let _ = old_parent.remove_child(&child_id);
        }
        child.inner.lock().unwrap().parent = Arc::downgrade(&self.inner);
        self.inner
            .lock()
            .unwrap()
            .children
            .insert(child_id, child.clone());
        Ok(())
    }

    /// Detach and return the child with the given id.
    ///
    /// # Errors
    /// [`Error::NotFound`] if no such child exists.
    pub fn remove_child(&self, id: &str) -> Result<Self> {
        let child = self
            .inner
            .lock()
            .unwrap()
            .children
            .shift_remove(id)
            .ok_or_else(|| Error::NotFound {
                what: "child",
                id: id.to_string(),
            })?;
        child.inner.lock().unwrap().parent = Weak::new();
        Ok(child)
    }

    /// Re-attach this node under `new_parent` (detaching it from its current
    /// parent first).
    ///
    /// # Errors
    /// Same conditions as [`add_child`](Self::add_child).
    pub fn move_to(&self, new_parent: &Self) -> Result<()> {
        new_parent.add_child(self)
    }

    /// The direct child with the given id.
    #[must_use]
    pub fn child(&self, id: &str) -> Option<Self> {
        self.inner.lock().unwrap().children.get(id).cloned()
    }

    /// Snapshot of the direct children in attachment order.
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.inner.lock().unwrap().children.values().cloned().collect()
    }

    /// Number of direct children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.lock().unwrap().children.len()
    }

    /// The parent node, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.inner
            .lock()
            .unwrap()
            .parent
            .upgrade()
            .map(|inner| Self { inner })
    }

    /// The topmost ancestor (`self` if detached).
    #[must_use]
    pub fn root(&self) -> Self {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// The parent chain from the immediate parent up to the root.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            out.push(node);
        }
        out
    }

    /// True if `self` is `other` or appears on `other`'s parent chain.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if self.same_node(&node) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Search `self` and its descendants (pre-order DFS) for a node id.
    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<Self> {
        if self.id() == id {
            return Some(self.clone());
        }
        for child in self.children() {
            if let Some(found) = child.find_node(id) {
                return Some(found);
            }
        }
        None
    }

    /// Number of edges between this node and its root.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }

    /// Length of the longest path down to a leaf (0 for a leaf).
    #[must_use]
    pub fn height(&self) -> usize {
        self.children()
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Every node reachable through `children`, excluding `self`.
    #[must_use]
    pub fn descendants(&self, order: Traversal) -> Vec<Self> {
        let mut out = Vec::new();
        match order {
            Traversal::BreadthFirst => {
                let mut queue: VecDeque<Self> = self.children().into();
                while let Some(node) = queue.pop_front() {
                    queue.extend(node.children());
                    out.push(node);
                }
            }
            Traversal::DepthFirst => {
                fn walk<T: ItemBound, K: KeyBound>(node: &Node<T, K>, out: &mut Vec<Node<T, K>>) {
                    for child in node.children() {
                        out.push(child.clone());
                        walk(&child, out);
                    }
                }
                walk(self, &mut out);
            }
        }
        out
    }

    /// Descendants in pre-order, skipping the subtrees of collapsed nodes.
    ///
    /// A collapsed node itself is still yielded; its children are not.
    #[must_use]
    pub fn visible_descendants(&self) -> Vec<Self> {
        fn walk<T: ItemBound, K: KeyBound>(node: &Node<T, K>, out: &mut Vec<Node<T, K>>) {
            for child in node.children() {
                out.push(child.clone());
                if !child.collapse_state().is_yes() {
                    walk(&child, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }

    /// Items of `self` followed by the flattened items of each child, in
    /// child order. Multi-grouped items appear once per hosting node.
    #[must_use]
    pub fn flattened_items(&self) -> Vec<(K, T)> {
        let mut out = self.items();
        for child in self.children() {
            out.extend(child.flattened_items());
        }
        out
    }

    /// Number of items in the whole subtree, counted per appearance.
    #[must_use]
    pub fn flattened_len(&self) -> usize {
        let (len, children) = {
            let g = self.inner.lock().unwrap();
            (g.items.len(), g.children.values().cloned().collect::<Vec<_>>())
        };
        len + children.iter().map(Self::flattened_len).sum::<usize>()
    }

    /// Produce an isomorphic copy: fresh vertices, cloned item handles,
    /// recursively cloned children. The copy's root is detached.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        let (id, items, children, collapsed, tag, key_of) = {
            let g = self.inner.lock().unwrap();
            (
                g.id.clone(),
                g.items.clone(),
                g.children.values().cloned().collect::<Vec<_>>(),
                g.collapsed,
                g.tag.clone(),
                Arc::clone(&g.key_of),
            )
        };
        let copy = Self::build(id, key_of, tag);
        {
            let mut g = copy.inner.lock().unwrap();
            g.items = items;
            g.collapsed = collapsed;
        }
        for child in children {
            let child_copy = child.deep_clone();
            // Cycle-free by construction: both sides are fresh vertices.
            let _ = copy.add_child(&child_copy);
        }
        copy
    }

    // |----------------|
    // | Collapse state |
    // |----------------|

    /// The node's stored collapse state.
    ///
    /// `Mixed` is only ever *derived* by aggregate views (see
    /// [`SlotManager::collapse_state`](crate::SlotManager::collapse_state));
    /// the mutators below write `Yes`/`No`.
    #[must_use]
    pub fn collapse_state(&self) -> Tristate {
        self.inner.lock().unwrap().collapsed
    }

    /// Force the collapse state.
    pub fn set_collapsed(&self, state: Tristate) {
        self.inner.lock().unwrap().collapsed = state;
    }

    /// Flip collapsed ↔ expanded (`Mixed` collapses).
    pub fn toggle(&self) {
        let mut g = self.inner.lock().unwrap();
        g.collapsed = match g.collapsed {
            Tristate::Yes => Tristate::No,
            Tristate::No | Tristate::Mixed => Tristate::Yes,
        };
    }

    /// Recursively expand this node and every descendant.
    pub fn expand_all(&self) {
        self.set_collapsed(Tristate::No);
        for node in self.descendants(Traversal::BreadthFirst) {
            node.set_collapsed(Tristate::No);
        }
    }

    /// Recursively collapse this node and every descendant.
    pub fn collapse_all(&self) {
        self.set_collapsed(Tristate::Yes);
        for node in self.descendants(Traversal::BreadthFirst) {
            node.set_collapsed(Tristate::Yes);
        }
    }

    /// Collapse every node at depth ≥ `level` below this node and expand the
    /// rest. Depth is counted relative to `self` (which is depth 0).
    pub fn collapse_to_level(&self, level: usize) {
        fn walk<T: ItemBound, K: KeyBound>(node: &Node<T, K>, depth: usize, level: usize) {
            node.set_collapsed(Tristate::from_bool(depth >= level));
            for child in node.children() {
                walk(&child, depth + 1, level);
            }
        }
        walk(self, 0, level);
    }
}
