//! The projection owner: source items in, projected tree out.
//!
//! A [`CollectionController`] owns the source items (an insertion-ordered
//! keyed map) and optional filter / sort / group / selection managers. Any
//! source mutation, any manager change, and an explicit
//! [`refresh`](CollectionController::refresh) triggers a synchronous rebuild:
//!
//! 1. take the source items in insertion order,
//! 2. drop the ones the [`FilterManager`](crate::FilterManager) rejects,
//! 3. stable-sort the survivors with the [`SortManager`](crate::SortManager)
//!    comparator,
//! 4. walk each item through the enabled
//!    [`GroupOption`](crate::GroupOption)s, creating group nodes per key —
//!    zero keys truncate the walk at the current level (folder-like), many
//!    keys enumerate the item into every sibling group (tag-like),
//! 5. swap the finished tree in and notify once.
//!
//! The new tree is built before the old one is touched, so observers only
//! ever see a complete projection — and a panicking user callback unwinds
//! out of the mutating call leaving the previous projection in place.
//! Rebuilds are not coalesced: each trigger rebuilds and notifies
//! immediately, so a burst of changes produces one notification per change
//! and the final state reflects them all.
//!
//! Projected group nodes carry a [`GroupTag`] and an id of the form
//! `<option_id>=<key>`; the `/`-joined ids form the stable *path id* the
//! [`SlotManager`](crate::SlotManager) keys its collapse registry by.

use crate::emitter::{ChangeEmitter, ListenerHandle, Subscription};
use crate::error::{Error, Result};
use crate::filter::FilterManager;
use crate::group::{GroupManager, GroupOption};
use crate::node::{GroupTag, ItemBound, KeyBound, KeyOf, Node};
use crate::pagination::PaginationState;
use crate::selection::SelectionManager;
use crate::snapshot::ViewState;
use crate::sort::SortManager;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, Weak};

/// Id of the projected root node.
pub const ROOT_ID: &str = "root";

struct ControllerInner<T, K> {
    key_of: KeyOf<T, K>,
    source: IndexMap<K, T>,
    filters: Option<FilterManager<T>>,
    sorts: Option<SortManager<T>>,
    groups: Option<GroupManager<T>>,
    selection: Option<SelectionManager<K>>,
    root: Node<T, K>,
    subs: Vec<Subscription>,
    disposed: bool,
}

/// Owns source items and keeps a filtered/sorted/grouped projection of them.
///
/// # Example
/// ```
/// use slotline::{CollectionController, GroupManager, GroupOption};
///
/// #[derive(Clone)]
/// struct Row { id: u32, shelf: String }
///
/// let groups = GroupManager::new();
/// groups.add(GroupOption::single("shelf", |r: &Row| Some(r.shelf.clone())));
///
/// let controller = CollectionController::new(|r: &Row| r.id).with_groups(groups);
/// controller.add(Row { id: 1, shelf: "a".into() }).unwrap();
/// controller.add(Row { id: 2, shelf: "b".into() }).unwrap();
///
/// let root = controller.root();
/// assert_eq!(root.child_count(), 2);
/// assert_eq!(root.child("shelf=a").unwrap().len(), 1);
/// ```
pub struct CollectionController<T, K> {
    inner: Arc<Mutex<ControllerInner<T, K>>>,
    emitter: ChangeEmitter,
}

impl<T, K> Clone for CollectionController<T, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: ItemBound, K: KeyBound> CollectionController<T, K> {
    /// Create a controller with no managers attached.
    pub fn new<F>(key_of: F) -> Self
    where
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        let key_of: KeyOf<T, K> = Arc::new(key_of);
        Self {
            inner: Arc::new(Mutex::new(ControllerInner {
                root: Node::new(ROOT_ID, Arc::clone(&key_of)),
                key_of,
                source: IndexMap::new(),
                filters: None,
                sorts: None,
                groups: None,
                selection: None,
                subs: Vec::new(),
                disposed: false,
            })),
            emitter: ChangeEmitter::new(),
        }
    }

    /// Attach a filter manager (builder form). Subscribes to its changes and
    /// rebuilds immediately.
    #[must_use]
    pub fn with_filters(self, filters: FilterManager<T>) -> Self {
        let sub = self.subscribe(filters.emitter());
        {
            let mut g = self.inner.lock().unwrap();
            g.filters = Some(filters);
            g.subs.push(sub);
        }
        reproject(&self.inner, &self.emitter);
        self
    }

    /// Attach a sort manager (builder form).
    #[must_use]
    pub fn with_sorts(self, sorts: SortManager<T>) -> Self {
        let sub = self.subscribe(sorts.emitter());
        {
            let mut g = self.inner.lock().unwrap();
            g.sorts = Some(sorts);
            g.subs.push(sub);
        }
        reproject(&self.inner, &self.emitter);
        self
    }

    /// Attach a group manager (builder form).
    #[must_use]
    pub fn with_groups(self, groups: GroupManager<T>) -> Self {
        let sub = self.subscribe(groups.emitter());
        {
            let mut g = self.inner.lock().unwrap();
            g.groups = Some(groups);
            g.subs.push(sub);
        }
        reproject(&self.inner, &self.emitter);
        self
    }

    /// Attach a selection manager (builder form). Selection does not affect
    /// the projection, so no rebuild is triggered.
    #[must_use]
    pub fn with_selection(self, selection: SelectionManager<K>) -> Self {
        self.inner.lock().unwrap().selection = Some(selection);
        self
    }

    fn subscribe(&self, upstream: &ChangeEmitter) -> Subscription {
        let weak = Arc::downgrade(&self.inner);
        let emitter = self.emitter.clone();
        let handle = upstream.add_listener(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                reproject(&inner, &emitter);
            }
        });
        Subscription::new(upstream.clone(), handle)
    }

    // |------------------|
    // | Source mutations |
    // |------------------|

    /// Append an item to the source.
    ///
    /// # Errors
    /// [`Error::DuplicateKey`] if the source already holds the item's key.
    pub fn add(&self, item: T) -> Result<()> {
        {
            let mut g = self.inner.lock().unwrap();
            let key = (g.key_of)(&item);
            if g.source.contains_key(&key) {
                return Err(Error::DuplicateKey {
                    node: ROOT_ID.to_string(),
                    key: format!("{key:?}"),
                });
            }
            g.source.insert(key, item);
        }
        reproject(&self.inner, &self.emitter);
        Ok(())
    }

    /// Append several items with a single rebuild. All-or-nothing: if any
    /// key collides (with the source or within the batch), nothing changes.
    ///
    /// # Errors
    /// [`Error::DuplicateKey`] on the first colliding key.
    pub fn add_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<()> {
        {
            let mut g = self.inner.lock().unwrap();
            let keyed: Vec<(K, T)> = items
                .into_iter()
                .map(|item| ((g.key_of)(&item), item))
                .collect();
            let mut incoming = std::collections::HashSet::new();
            for (key, _) in &keyed {
                if g.source.contains_key(key) || !incoming.insert(key.clone()) {
                    return Err(Error::DuplicateKey {
                        node: ROOT_ID.to_string(),
                        key: format!("{key:?}"),
                    });
                }
            }
            if keyed.is_empty() {
                return Ok(());
            }
            for (key, item) in keyed {
                g.source.insert(key, item);
            }
        }
        reproject(&self.inner, &self.emitter);
        Ok(())
    }

    /// Remove the item with the same key as `item`. Returns it if present.
    pub fn remove(&self, item: &T) -> Option<T> {
        let key = self.key_for(item);
        self.remove_by_key(&key)
    }

    /// Remove the item under `key`. Returns it if present.
    pub fn remove_by_key(&self, key: &K) -> Option<T> {
        let removed = self.inner.lock().unwrap().source.shift_remove(key);
        if removed.is_some() {
            reproject(&self.inner, &self.emitter);
        }
        removed
    }

    /// Replace the item with the same key in place. Returns the old item.
    ///
    /// # Errors
    /// [`Error::NotFound`] if the key is not in the source.
    pub fn replace(&self, item: T) -> Result<T> {
        let old = {
            let mut g = self.inner.lock().unwrap();
            let key = (g.key_of)(&item);
            let Some(slot) = g.source.get_mut(&key) else {
                return Err(Error::NotFound {
                    what: "item",
                    id: format!("{key:?}"),
                });
            };
            std::mem::replace(slot, item)
        };
        reproject(&self.inner, &self.emitter);
        Ok(old)
    }

    /// Remove every source item.
    pub fn clear(&self) {
        let had_items = {
            let mut g = self.inner.lock().unwrap();
            let had = !g.source.is_empty();
            g.source.clear();
            had
        };
        if had_items {
            reproject(&self.inner, &self.emitter);
        }
    }

    /// Rebuild the projection explicitly (e.g. after external state the
    /// callbacks read has changed behind the engine's back).
    pub fn refresh(&self) {
        reproject(&self.inner, &self.emitter);
    }

    // |--------|
    // | Access |
    // |--------|

    /// Source items in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.inner.lock().unwrap().source.values().cloned().collect()
    }

    /// Source keys in insertion order.
    #[must_use]
    pub fn source_keys(&self) -> Vec<K> {
        self.inner.lock().unwrap().source.keys().cloned().collect()
    }

    /// The source item under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<T> {
        self.inner.lock().unwrap().source.get(key).cloned()
    }

    /// Number of source items.
    #[must_use]
    pub fn source_len(&self) -> usize {
        self.inner.lock().unwrap().source.len()
    }

    /// Projected item count: every item appearance in the tree, headers
    /// excluded. With multi-valued grouping this exceeds
    /// [`source_len`](Self::source_len).
    #[must_use]
    pub fn len(&self) -> usize {
        self.root().flattened_len()
    }

    /// True if the projection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current projected tree.
    ///
    /// The handle is shared with the controller: treat it as read-only.
    /// Mutating the projection directly is unsupported and is overwritten by
    /// the next rebuild.
    #[must_use]
    pub fn root(&self) -> Node<T, K> {
        self.inner.lock().unwrap().root.clone()
    }

    /// Apply the controller's key extractor to an item.
    #[must_use]
    pub fn key_for(&self, item: &T) -> K {
        let key_of = Arc::clone(&self.inner.lock().unwrap().key_of);
        key_of(item)
    }

    /// The attached filter manager.
    #[must_use]
    pub fn filters(&self) -> Option<FilterManager<T>> {
        self.inner.lock().unwrap().filters.clone()
    }

    /// The attached sort manager.
    #[must_use]
    pub fn sorts(&self) -> Option<SortManager<T>> {
        self.inner.lock().unwrap().sorts.clone()
    }

    /// The attached group manager.
    #[must_use]
    pub fn groups(&self) -> Option<GroupManager<T>> {
        self.inner.lock().unwrap().groups.clone()
    }

    /// The attached selection manager.
    #[must_use]
    pub fn selection(&self) -> Option<SelectionManager<K>> {
        self.inner.lock().unwrap().selection.clone()
    }

    /// Capture the state of every attached manager (plus an optional
    /// pagination state) into one [`ViewState`]. Detached managers
    /// contribute empty snapshots.
    #[must_use]
    pub fn capture_view(&self, pagination: Option<&PaginationState>) -> ViewState {
        ViewState {
            filters: self
                .filters()
                .map(|m| m.capture_state())
                .unwrap_or_default(),
            sorts: self.sorts().map(|m| m.capture_state()).unwrap_or_default(),
            groups: self.groups().map(|m| m.capture_state()).unwrap_or_default(),
            pagination: pagination
                .map(PaginationState::capture_state)
                .unwrap_or_default(),
        }
    }

    /// Restore every attached manager (plus an optional pagination state)
    /// from a [`ViewState`].
    ///
    /// Each manager restores and notifies independently, so this triggers
    /// one rebuild per attached manager rather than one in total; the final
    /// projection reflects the whole view.
    pub fn restore_view(&self, view: &ViewState, pagination: Option<&PaginationState>) {
        if let Some(filters) = self.filters() {
            filters.restore_state(&view.filters);
        }
        if let Some(sorts) = self.sorts() {
            sorts.restore_state(&view.sorts);
        }
        if let Some(groups) = self.groups() {
            groups.restore_state(&view.groups);
        }
        if let Some(pagination) = pagination {
            pagination.restore_state(&view.pagination);
        }
    }

    /// Register a change listener; fires once per completed rebuild.
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

    pub(crate) fn emitter(&self) -> &ChangeEmitter {
        &self.emitter
    }

    /// Unsubscribe from every attached manager and drop the controller's own
    /// listeners. Externally provided managers are NOT disposed; they belong
    /// to the caller.
    pub fn dispose(&self) {
        let subs = {
            let mut g = self.inner.lock().unwrap();
            g.disposed = true;
            std::mem::take(&mut g.subs)
        };
        for sub in &subs {
            sub.unsubscribe();
        }
        self.emitter.dispose();
    }
}

/// Rebuild the projection and notify.
///
/// The source snapshot is taken under the lock; the tree is built with the
/// lock released so user callbacks never run inside it, then swapped in.
fn reproject<T: ItemBound, K: KeyBound>(
    inner: &Arc<Mutex<ControllerInner<T, K>>>,
    emitter: &ChangeEmitter,
) {
    let (mut items, filters, sorts, options, key_of) = {
        let g = inner.lock().unwrap();
        if g.disposed {
            return;
        }
        (
            g.source.values().cloned().collect::<Vec<T>>(),
            g.filters.clone(),
            g.sorts.clone(),
            g.groups.as_ref().map(GroupManager::options).unwrap_or_default(),
            Arc::clone(&g.key_of),
        )
    };

    if let Some(filters) = &filters {
        let pred = filters.predicate();
        items.retain(|item| pred(item));
    }
    if let Some(sorts) = &sorts {
        let cmp = sorts.comparator();
        items.sort_by(|a, b| cmp(a, b));
    }

    let root = Node::new(ROOT_ID, Arc::clone(&key_of));
    if options.is_empty() {
        for item in items {
            // Source keys are unique, so this cannot collide.
            let _ = root.add(item);
        }
    } else {
        for item in &items {
            place(&root, item, &options, 0, &key_of);
        }
    }

    inner.lock().unwrap().root = root;
    emitter.notify();
}

/// Walk one item down the grouping levels starting at `level`, adding it at
/// every branch it reaches.
fn place<T: ItemBound, K: KeyBound>(
    node: &Node<T, K>,
    item: &T,
    options: &[GroupOption<T>],
    level: usize,
    key_of: &KeyOf<T, K>,
) {
    let Some(option) = options.get(level) else {
        let _ = node.add(item.clone());
        return;
    };
    let keys = option.keys_for(item);
    if keys.is_empty() {
        // Folder-like: no key at this level ends the walk here.
        let _ = node.add(item.clone());
        return;
    }
    for key in keys {
        let child = ensure_child(node, option, &key, key_of);
        place(&child, item, options, level + 1, key_of);
    }
}

fn ensure_child<T: ItemBound, K: KeyBound>(
    parent: &Node<T, K>,
    option: &GroupOption<T>,
    key: &str,
    key_of: &KeyOf<T, K>,
) -> Node<T, K> {
    let id = format!("{}={}", option.id(), key);
    if let Some(existing) = parent.child(&id) {
        return existing;
    }
    let child = Node::with_tag(
        id,
        Arc::clone(key_of),
        GroupTag {
            option_id: option.id(),
            key: key.to_string(),
        },
    );
    // Fresh child under a fresh tree: cannot cycle or collide.
    let _ = parent.add_child(&child);
    child
}
