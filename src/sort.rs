//! Ordering: typed sort options and the lexicographic sort manager.
//!
//! A [`SortManager`] holds an ordered list of sort options. Its comparator
//! walks the options in order and the first non-equal comparison wins; ties
//! after the last option fall back to input order (the engine only ever
//! applies the comparator through a stable sort).
//!
//! Missing keys (`None`) sort LAST regardless of direction. That invariant
//! avoids the classic surprise where flipping to descending suddenly floats
//! every blank cell to the top; [`ValueSortOption::nulls_first`] exists for
//! the implementations that disagree, and is off by default.

use crate::emitter::{ChangeEmitter, ListenerHandle};
use crate::node::ItemBound;
use crate::snapshot::{SortCriteria, SortSnapshot};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

/// Sort direction.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Natural order (the default).
    #[default]
    Asc,
    /// Reversed natural order.
    Desc,
}

impl SortDirection {
    /// The opposite direction.
    #[inline]
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Apply the direction to a natural-order comparison result.
    #[inline]
    #[must_use]
    pub const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// Object-safe view of a sort option.
///
/// The direction is passed in by the manager so an option never needs to be
/// mutated after construction.
pub trait DynSort<T>: Send + Sync {
    /// The option's id.
    fn id(&self) -> String;
    /// Compare two items under the given direction.
    fn compare(&self, a: &T, b: &T, direction: SortDirection) -> Ordering;
}

type SortKeyFn<T, V> = Arc<dyn Fn(&T) -> Option<V> + Send + Sync>;

/// A sort option keyed by a naturally ordered value.
///
/// The key extractor returns `Option<V>`; `None` keys sort last regardless
/// of direction (see the module docs).
///
/// # Example
/// ```
/// use slotline::{SortDirection, ValueSortOption, DynSort};
/// use std::cmp::Ordering;
///
/// let by_len = ValueSortOption::new("len", |s: &String| Some(s.len()));
/// let a = "ab".to_string();
/// let b = "abcd".to_string();
/// assert_eq!(by_len.compare(&a, &b, SortDirection::Asc), Ordering::Less);
/// assert_eq!(by_len.compare(&a, &b, SortDirection::Desc), Ordering::Greater);
/// ```
pub struct ValueSortOption<T, V> {
    id: String,
    key: SortKeyFn<T, V>,
    nulls_first: bool,
}

impl<T, V> Clone for ValueSortOption<T, V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            key: Arc::clone(&self.key),
            nulls_first: self.nulls_first,
        }
    }
}

impl<T: ItemBound, V: Ord + 'static> ValueSortOption<T, V> {
    /// Create an option from a key extractor.
    pub fn new<F>(id: impl Into<String>, key: F) -> Self
    where
        F: Fn(&T) -> Option<V> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            key: Arc::new(key),
            nulls_first: false,
        }
    }

    /// Sort `None` keys first instead of last. Off by default.
    #[must_use]
    pub fn nulls_first(mut self, nulls_first: bool) -> Self {
        self.nulls_first = nulls_first;
        self
    }
}

impl<T: ItemBound, V: Ord + Send + Sync + 'static> DynSort<T> for ValueSortOption<T, V> {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn compare(&self, a: &T, b: &T, direction: SortDirection) -> Ordering {
        match ((self.key)(a), (self.key)(b)) {
            (Some(ka), Some(kb)) => direction.apply(ka.cmp(&kb)),
            (None, None) => Ordering::Equal,
            // Null placement ignores direction.
            (None, Some(_)) => {
                if self.nulls_first {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (Some(_), None) => {
                if self.nulls_first {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
        }
    }
}

/// A sort option keyed by a float, with a total order over NaN and friends.
pub fn float_sort_option<T, F>(
    id: impl Into<String>,
    key: F,
) -> ValueSortOption<T, OrderedFloat<f64>>
where
    T: ItemBound,
    F: Fn(&T) -> Option<f64> + Send + Sync + 'static,
{
    ValueSortOption::new(id, move |item: &T| key(item).map(OrderedFloat))
}

type CompareFn<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// A sort option driven by an arbitrary comparator callback.
///
/// Use this when the ordering cannot be expressed as a natural-order key
/// (collation tables, multi-field tie chains, ...). The direction reverses
/// the comparator's result wholesale.
pub struct ComparatorSortOption<T> {
    id: String,
    cmp: CompareFn<T>,
}

impl<T> Clone for ComparatorSortOption<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            cmp: Arc::clone(&self.cmp),
        }
    }
}

impl<T: ItemBound> ComparatorSortOption<T> {
    /// Create an option from a comparator.
    pub fn new<F>(id: impl Into<String>, cmp: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            cmp: Arc::new(cmp),
        }
    }
}

impl<T: ItemBound> DynSort<T> for ComparatorSortOption<T> {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn compare(&self, a: &T, b: &T, direction: SortDirection) -> Ordering {
        direction.apply((self.cmp)(a, b))
    }
}

struct SortEntry<T> {
    option: Arc<dyn DynSort<T>>,
    direction: SortDirection,
}

struct ManagerInner<T> {
    entries: Vec<SortEntry<T>>,
}

/// The sort registry: an ordered list of options producing one total order.
///
/// The front entry is the *current* (primary) option;
/// [`set_current`](Self::set_current) moves an option to the front and
/// [`set_sort_order`](Self::set_sort_order) flips the current direction.
///
/// # Example
/// ```
/// use slotline::{SortManager, ValueSortOption};
///
/// let manager: SortManager<(u8, u8)> = SortManager::new();
/// manager.add(ValueSortOption::new("major", |it: &(u8, u8)| Some(it.0)));
/// manager.add(ValueSortOption::new("minor", |it: &(u8, u8)| Some(it.1)));
///
/// let mut rows = vec![(2, 1), (1, 2), (1, 1)];
/// let cmp = manager.comparator();
/// rows.sort_by(|a, b| cmp(a, b));
/// assert_eq!(rows, vec![(1, 1), (1, 2), (2, 1)]);
/// ```
pub struct SortManager<T> {
    inner: Arc<Mutex<ManagerInner<T>>>,
    emitter: ChangeEmitter,
}

impl<T> Clone for SortManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: ItemBound> Default for SortManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ItemBound> SortManager<T> {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManagerInner { entries: Vec::new() })),
            emitter: ChangeEmitter::new(),
        }
    }

    /// Append an option with the default (ascending) direction.
    ///
    /// An option with an id that is already registered replaces that entry
    /// in place, keeping its position and direction.
    pub fn add<S>(&self, option: S)
    where
        S: DynSort<T> + 'static,
    {
        self.insert(Arc::new(option), None);
        self.emitter.notify();
    }

    /// Append an option with an explicit direction.
    pub fn add_directed<S>(&self, option: S, direction: SortDirection)
    where
        S: DynSort<T> + 'static,
    {
        self.insert(Arc::new(option), Some(direction));
        self.emitter.notify();
    }

    /// Append several options in one notification.
    pub fn add_all<I, S>(&self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: DynSort<T> + 'static,
    {
        let mut any = false;
        for option in options {
            self.insert(Arc::new(option), None);
            any = true;
        }
        if any {
            self.emitter.notify();
        }
    }

    fn insert(&self, option: Arc<dyn DynSort<T>>, direction: Option<SortDirection>) {
        let id = option.id();
        let mut g = self.inner.lock().unwrap();
        if let Some(entry) = g.entries.iter_mut().find(|e| e.option.id() == id) {
            entry.option = option;
            if let Some(direction) = direction {
                entry.direction = direction;
            }
        } else {
            g.entries.push(SortEntry {
                option,
                direction: direction.unwrap_or_default(),
            });
        }
    }

    /// Remove the option with the given id. Returns `true` if it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut g = self.inner.lock().unwrap();
            let before = g.entries.len();
            g.entries.retain(|e| e.option.id() != id);
            g.entries.len() != before
        };
        if removed {
            self.emitter.notify();
        }
        removed
    }

    /// Remove every option.
    pub fn clear_sorts(&self) {
        let had_entries = {
            let mut g = self.inner.lock().unwrap();
            let had = !g.entries.is_empty();
            g.entries.clear();
            had
        };
        if had_entries {
            self.emitter.notify();
        }
    }

    /// Make the option with the given id the primary sort (move it to the
    /// front, keeping its direction). Returns `false` for unknown ids.
    pub fn set_current(&self, id: &str) -> bool {
        let moved = {
            let mut g = self.inner.lock().unwrap();
            match g.entries.iter().position(|e| e.option.id() == id) {
                Some(0) => return true,
                Some(index) => {
                    let entry = g.entries.remove(index);
                    g.entries.insert(0, entry);
                    true
                }
                None => false,
            }
        };
        if moved {
            self.emitter.notify();
        }
        moved
    }

    /// Set the direction of the current (front) option.
    pub fn set_sort_order(&self, direction: SortDirection) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            match g.entries.first_mut() {
                Some(entry) if entry.direction != direction => {
                    entry.direction = direction;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Id of the current (front) option.
    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .first()
            .map(|e| e.option.id())
    }

    /// Direction of the current (front) option.
    #[must_use]
    pub fn current_order(&self) -> Option<SortDirection> {
        self.inner.lock().unwrap().entries.first().map(|e| e.direction)
    }

    /// Compare two items by walking the options in order; the first
    /// non-equal comparison wins.
    ///
    /// Returns [`Ordering::Equal`] when every option ties (or none are
    /// registered); a stable sort then preserves input order, which is the
    /// final implicit tie-break.
    #[must_use]
    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        self.comparator()(a, b)
    }

    /// Snapshot the registry into a standalone comparator.
    ///
    /// The controller uses this during rebuild so the manager lock is taken
    /// once per rebuild, not O(n log n) times.
    #[must_use]
    pub fn comparator(&self) -> impl Fn(&T, &T) -> Ordering + use<T> {
        let entries: Vec<(Arc<dyn DynSort<T>>, SortDirection)> = {
            let g = self.inner.lock().unwrap();
            g.entries
                .iter()
                .map(|e| (Arc::clone(&e.option), e.direction))
                .collect()
        };
        move |a, b| {
            for (option, direction) in &entries {
                let ordering = option.compare(a, b, *direction);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        }
    }

    /// Ids of the registered options, primary first.
    #[must_use]
    pub fn sort_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|e| e.option.id())
            .collect()
    }

    /// Direction of the option with the given id.
    #[must_use]
    pub fn direction_of(&self, id: &str) -> Option<SortDirection> {
        self.inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .find(|e| e.option.id() == id)
            .map(|e| e.direction)
    }

    /// Number of registered options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// True if no options are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }

    /// Capture the active criteria, primary first.
    #[must_use]
    pub fn capture_state(&self) -> SortSnapshot {
        let criteria = self
            .inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .map(|e| SortCriteria {
                id: e.option.id(),
                order: e.direction,
            })
            .collect();
        SortSnapshot { criteria }
    }

    /// Reorder and redirect the registered options from a snapshot.
    ///
    /// Options listed in the snapshot move to the front in snapshot order
    /// with the snapshot's directions; options the snapshot does not mention
    /// keep their relative order behind them; snapshot ids that are not
    /// registered are ignored. Notifies once.
    pub fn restore_state(&self, snapshot: &SortSnapshot) {
        {
            let mut g = self.inner.lock().unwrap();
            let mut rest: Vec<SortEntry<T>> = g.entries.drain(..).collect();
            let mut reordered = Vec::with_capacity(rest.len());
            for criteria in &snapshot.criteria {
                if let Some(index) = rest.iter().position(|e| e.option.id() == criteria.id) {
                    let mut entry = rest.remove(index);
                    entry.direction = criteria.order;
                    reordered.push(entry);
                }
            }
            reordered.append(&mut rest);
            g.entries = reordered;
        }
        self.emitter.notify();
    }

    /// Register a change listener.
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

    /// Drop all listeners.
    pub fn dispose(&self) {
        self.emitter.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_helpers() {
        assert_eq!(SortDirection::Asc.reversed(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.reversed(), SortDirection::Asc);
        assert_eq!(SortDirection::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(SortDirection::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(SortDirection::Desc.apply(Ordering::Equal), Ordering::Equal);
    }

    #[test]
    fn empty_manager_compares_everything_equal() {
        let manager: SortManager<u8> = SortManager::new();
        assert_eq!(manager.compare(&1, &2), Ordering::Equal);
        assert_eq!(manager.current(), None);
        assert_eq!(manager.current_order(), None);
        assert_eq!(manager.direction_of("nope"), None);
    }

    #[test]
    fn re_adding_an_option_replaces_it_in_place() {
        let manager: SortManager<u8> = SortManager::new();
        manager.add(ValueSortOption::new("a", |n: &u8| Some(*n)));
        manager.add_directed(ValueSortOption::new("b", |n: &u8| Some(*n)), SortDirection::Desc);

        manager.add(ValueSortOption::new("b", |n: &u8| Some(255 - *n)));
        assert_eq!(manager.sort_ids(), vec!["a", "b"], "position is kept");
        assert_eq!(
            manager.direction_of("b"),
            Some(SortDirection::Desc),
            "direction is kept when the replacement has none"
        );
    }
}
