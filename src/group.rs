//! Grouping criteria: per-level key producers and the ordered registry.
//!
//! A [`GroupOption`] turns an item into zero, one, or many group keys for
//! one level of the projected tree:
//!
//! - zero keys (a `None` value): **folder-like** — the item does not
//!   participate in that level and stays where the walk currently is,
//! - one key: the ordinary case,
//! - many keys (a multi-valued producer): **tag-like** — the item is
//!   enumerated into every matching sibling group.
//!
//! A [`GroupManager`] holds the options ordered by their `order` field
//! (insertion order breaks ties) and exposes only the `enabled` ones to the
//! projection. Flipping `enabled` or changing `order` on an option notifies
//! the manager, which re-emits, which makes the controller regroup.

use crate::emitter::{ChangeEmitter, ListenerHandle, Subscription};
use crate::node::ItemBound;
use crate::snapshot::GroupSnapshot;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex, Weak};

type SingleFn<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;
type MultiFn<T> = Arc<dyn Fn(&T) -> Vec<String> + Send + Sync>;

enum KeyProducer<T> {
    Single(SingleFn<T>),
    Multi(MultiFn<T>),
}

impl<T> Clone for KeyProducer<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Single(f) => Self::Single(Arc::clone(f)),
            Self::Multi(f) => Self::Multi(Arc::clone(f)),
        }
    }
}

struct OptionInner<T> {
    id: String,
    order: i64,
    enabled: bool,
    producer: KeyProducer<T>,
}

/// One grouping criterion: id, sort position, enabled flag, key producer.
///
/// `GroupOption` is a cheap handle; keep a clone to flip `enabled` or move
/// the option after registering it with a [`GroupManager`].
///
/// # Example
/// ```
/// use slotline::GroupOption;
///
/// #[derive(Clone)]
/// struct Task { category: String, assignee: Option<String> }
///
/// let by_cat = GroupOption::single("cat", |t: &Task| Some(t.category.clone()));
/// let by_assignee = GroupOption::single("who", |t: &Task| t.assignee.clone());
///
/// let orphan = Task { category: "ops".into(), assignee: None };
/// assert_eq!(by_cat.keys_for(&orphan), vec!["ops".to_string()]);
/// assert!(by_assignee.keys_for(&orphan).is_empty()); // folder-like
/// ```
pub struct GroupOption<T> {
    inner: Arc<Mutex<OptionInner<T>>>,
    emitter: ChangeEmitter,
}

impl<T> Clone for GroupOption<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: ItemBound> GroupOption<T> {
    /// A single-valued option; the key is the value's `Display` form.
    pub fn single<V, F>(id: impl Into<String>, value: F) -> Self
    where
        V: Display,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        Self::build(
            id.into(),
            KeyProducer::Single(Arc::new(move |item| value(item).map(|v| v.to_string()))),
        )
    }

    /// A single-valued option with an explicit key builder. A `None` key
    /// behaves exactly like a `None` value (folder-like).
    pub fn single_keyed<V, F, B>(id: impl Into<String>, value: F, key_builder: B) -> Self
    where
        V: 'static,
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
        B: Fn(&V) -> Option<String> + Send + Sync + 'static,
    {
        Self::build(
            id.into(),
            KeyProducer::Single(Arc::new(move |item| {
                value(item).and_then(|v| key_builder(&v))
            })),
        )
    }

    /// A multi-valued option; each value's `Display` form becomes a key.
    pub fn multi<V, F>(id: impl Into<String>, values: F) -> Self
    where
        V: Display,
        F: Fn(&T) -> Vec<V> + Send + Sync + 'static,
    {
        Self::build(
            id.into(),
            KeyProducer::Multi(Arc::new(move |item| {
                values(item).iter().map(ToString::to_string).collect()
            })),
        )
    }

    /// A multi-valued option with an explicit key builder. Values mapped to
    /// `None` contribute no key.
    pub fn multi_keyed<V, F, B>(id: impl Into<String>, values: F, key_builder: B) -> Self
    where
        V: 'static,
        F: Fn(&T) -> Vec<V> + Send + Sync + 'static,
        B: Fn(&V) -> Option<String> + Send + Sync + 'static,
    {
        Self::build(
            id.into(),
            KeyProducer::Multi(Arc::new(move |item| {
                values(item).iter().filter_map(|v| key_builder(v)).collect()
            })),
        )
    }

    fn build(id: String, producer: KeyProducer<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OptionInner {
                id,
                order: 0,
                enabled: true,
                producer,
            })),
            emitter: ChangeEmitter::new(),
        }
    }

    /// Set the option's sort position (builder form).
    #[must_use]
    pub fn with_order(self, order: i64) -> Self {
        self.inner.lock().unwrap().order = order;
        self
    }

    /// Start the option disabled (builder form).
    #[must_use]
    pub fn disabled(self) -> Self {
        self.inner.lock().unwrap().enabled = false;
        self
    }

    /// The option's id.
    #[must_use]
    pub fn id(&self) -> String {
        self.inner.lock().unwrap().id.clone()
    }

    /// The option's sort position among its siblings.
    #[must_use]
    pub fn order(&self) -> i64 {
        self.inner.lock().unwrap().order
    }

    /// Whether the option participates in grouping.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.inner.lock().unwrap().enabled
    }

    /// True for multi-valued (tag-like) options.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self.inner.lock().unwrap().producer, KeyProducer::Multi(_))
    }

    /// Move the option to a new sort position. Notifies on change.
    pub fn set_order(&self, order: i64) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            if g.order == order {
                false
            } else {
                g.order = order;
                true
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Enable or disable the option. Notifies on change.
    pub fn set_enabled(&self, enabled: bool) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            if g.enabled == enabled {
                false
            } else {
                g.enabled = enabled;
                true
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// The group keys this option produces for an item, duplicates removed
    /// (a duplicate key would mean the same item twice in the same group).
    #[must_use]
    pub fn keys_for(&self, item: &T) -> Vec<String> {
        let producer = self.inner.lock().unwrap().producer.clone();
        let raw = match producer {
            KeyProducer::Single(f) => f(item).into_iter().collect::<Vec<_>>(),
            KeyProducer::Multi(f) => f(item),
        };
        let mut seen = std::collections::HashSet::new();
        raw.into_iter().filter(|k| seen.insert(k.clone())).collect()
    }

    /// Register a change listener on this option.
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

    fn option_emitter(&self) -> &ChangeEmitter {
        &self.emitter
    }
}

struct GroupEntry<T> {
    option: GroupOption<T>,
    sub: Subscription,
}

struct ManagerInner<T> {
    entries: Vec<GroupEntry<T>>,
    restoring: bool,
}

/// The grouping registry, ordered by each option's `order` field.
///
/// Insertion order breaks order ties, and the sort is stable, so two options
/// with equal `order` keep their registration sequence.
pub struct GroupManager<T> {
    inner: Arc<Mutex<ManagerInner<T>>>,
    emitter: ChangeEmitter,
}

impl<T> Clone for GroupManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: ItemBound> Default for GroupManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ItemBound> GroupManager<T> {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManagerInner {
                entries: Vec::new(),
                restoring: false,
            })),
            emitter: ChangeEmitter::new(),
        }
    }

    /// Register an option. Returns `false` (and changes nothing) if an
    /// option with the same id is already registered.
    pub fn add(&self, option: GroupOption<T>) -> bool {
        let id = option.id();
        {
            let g = self.inner.lock().unwrap();
            if g.entries.iter().any(|e| e.option.id() == id) {
                return false;
            }
        }
        self.insert(option);
        self.emitter.notify();
        true
    }

    /// Register an option, replacing any previous option with the same id.
    pub fn add_replacing(&self, option: GroupOption<T>) {
        let id = option.id();
        if let Some(old) = self.take(&id) {
            old.sub.unsubscribe();
        }
        self.insert(option);
        self.emitter.notify();
    }

    /// Register several options in one notification. Duplicates are skipped.
    pub fn add_all<I: IntoIterator<Item = GroupOption<T>>>(&self, options: I) {
        let mut any = false;
        for option in options {
            let id = option.id();
            let exists = self
                .inner
                .lock()
                .unwrap()
                .entries
                .iter()
                .any(|e| e.option.id() == id);
            if !exists {
                self.insert(option);
                any = true;
            }
        }
        if any {
            self.emitter.notify();
        }
    }

    fn insert(&self, option: GroupOption<T>) {
        let weak = Arc::downgrade(&self.inner);
        let re_emit = self.emitter.clone();
        let handle = option.option_emitter().add_listener(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                if inner.lock().unwrap().restoring {
                    return;
                }
                re_emit.notify();
            }
        });
        let sub = Subscription::new(option.option_emitter().clone(), handle);
        self.inner
            .lock()
            .unwrap()
            .entries
            .push(GroupEntry { option, sub });
    }

    fn take(&self, id: &str) -> Option<GroupEntry<T>> {
        let mut g = self.inner.lock().unwrap();
        let index = g.entries.iter().position(|e| e.option.id() == id)?;
        Some(g.entries.remove(index))
    }

    /// Deregister an option by id.
    pub fn remove(&self, id: &str) -> Option<GroupOption<T>> {
        let entry = self.take(id)?;
        entry.sub.unsubscribe();
        self.emitter.notify();
        Some(entry.option)
    }

    /// Deregister every option.
    pub fn clear(&self) {
        let entries: Vec<GroupEntry<T>> = {
            let mut g = self.inner.lock().unwrap();
            g.entries.drain(..).collect()
        };
        if entries.is_empty() {
            return;
        }
        for entry in &entries {
            entry.sub.unsubscribe();
        }
        self.emitter.notify();
    }

    /// Bulk-assign orders and notify once.
    pub fn reorder(&self, orders: &[(String, i64)]) {
        let options: Vec<GroupOption<T>> = {
            let mut g = self.inner.lock().unwrap();
            g.restoring = true;
            g.entries.iter().map(|e| e.option.clone()).collect()
        };
        for option in &options {
            if let Some((_, order)) = orders.iter().find(|(id, _)| *id == option.id()) {
                option.set_order(*order);
            }
        }
        self.inner.lock().unwrap().restoring = false;
        self.emitter.notify();
    }

    /// The registered option with the given id.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<GroupOption<T>> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|e| e.option.id() == id)
            .map(|e| e.option.clone())
    }

    /// Every registered option (including disabled ones), sorted by order.
    #[must_use]
    pub fn all_options(&self) -> Vec<GroupOption<T>> {
        let mut options: Vec<GroupOption<T>> = self
            .inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|e| e.option.clone())
            .collect();
        options.sort_by_key(GroupOption::order);
        options
    }

    /// The enabled options, sorted by order. This is the sequence of levels
    /// the projection walks.
    #[must_use]
    pub fn options(&self) -> Vec<GroupOption<T>> {
        self.all_options().into_iter().filter(GroupOption::enabled).collect()
    }

    /// Number of registered options (enabled or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// True if no options are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }

    /// Capture the enabled ids (in level order) and every option's order.
    #[must_use]
    pub fn capture_state(&self) -> GroupSnapshot {
        let active_ids = self.options().iter().map(GroupOption::id).collect();
        let orders: BTreeMap<String, i64> = self
            .all_options()
            .iter()
            .map(|o| (o.id(), o.order()))
            .collect();
        GroupSnapshot { active_ids, orders }
    }

    /// Restore enabled flags and orders from a snapshot. Options listed in
    /// `active_ids` are enabled with the snapshot's order (or their list
    /// position when the `orders` map omits them); everything else is
    /// disabled. Unknown ids are ignored. Notifies once.
    pub fn restore_state(&self, snapshot: &GroupSnapshot) {
        let options: Vec<GroupOption<T>> = {
            let mut g = self.inner.lock().unwrap();
            g.restoring = true;
            g.entries.iter().map(|e| e.option.clone()).collect()
        };
        for option in &options {
            let id = option.id();
            match snapshot.active_ids.iter().position(|a| *a == id) {
                Some(position) => {
                    option.set_enabled(true);
                    let order = snapshot
                        .orders
                        .get(&id)
                        .copied()
                        .unwrap_or(position as i64);
                    option.set_order(order);
                }
                None => option.set_enabled(false),
            }
        }
        self.inner.lock().unwrap().restoring = false;
        self.emitter.notify();
    }

    /// Register a change listener. Fires for registry changes and for
    /// `order` / `enabled` changes on any registered option.
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

    /// Drop all listeners and unsubscribe from every registered option.
    pub fn dispose(&self) {
        let mut g = self.inner.lock().unwrap();
        for entry in &g.entries {
            entry.sub.unsubscribe();
        }
        g.entries.clear();
        drop(g);
        self.emitter.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_forms_set_order_and_enabled() {
        let option: GroupOption<u8> = GroupOption::single("n", |n: &u8| Some(*n))
            .with_order(7)
            .disabled();
        assert_eq!(option.id(), "n");
        assert_eq!(option.order(), 7);
        assert!(!option.enabled());
        assert!(!option.is_multi());

        let multi: GroupOption<u8> = GroupOption::multi("m", |n: &u8| vec![*n]);
        assert!(multi.is_multi());
    }

    #[test]
    fn multi_key_builder_drops_none_values() {
        let option: GroupOption<u8> = GroupOption::multi_keyed(
            "bits",
            |n: &u8| vec![*n % 2, *n / 2],
            |v: &u8| if *v == 0 { None } else { Some(format!("b{v}")) },
        );
        assert_eq!(option.keys_for(&3), vec!["b1".to_string()]);
        assert!(option.keys_for(&0).is_empty());
    }

    #[test]
    fn empty_manager_walks_no_levels() {
        let manager: GroupManager<u8> = GroupManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
        assert!(manager.options().is_empty());
        assert!(manager.by_id("nope").is_none());
        assert!(manager.remove("nope").is_none());
    }
}
