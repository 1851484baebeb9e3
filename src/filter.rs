//! Composable filtering: typed filters, the type-erased registry, and
//! boolean expression trees.
//!
//! This module defines:
//!
//! - [`Filter<T, V>`]: a typed filter with an id, a `test(item, value)`
//!   predicate, and an ordered set of active values. Within one filter the
//!   active values are OR-combined; a filter with no active values passes
//!   everything.
//! - [`DynFilter<T>`]: the object-safe erasure the manager stores. The
//!   per-filter value type `V` is internal to each filter instance; the
//!   manager only sees the item type `T`.
//! - [`FilterManager<T>`]: the registry. Across filters results are
//!   AND-combined; an empty manager accepts everything.
//! - [`FilterExpr<T>`]: user-composable `And` / `Or` / `Not` / `Ref` trees.
//! - [`text_filter`] / [`regex_filter`]: ready-made text-search filters.
//!
//! Value mutations notify the filter's emitter; the manager subscribes to
//! every registered filter and re-emits, so one listener on the manager sees
//! every relevant change.

use crate::emitter::{ChangeEmitter, ListenerHandle, Subscription};
use crate::node::ItemBound;
use crate::snapshot::{FilterCriteria, FilterSnapshot};
use indexmap::IndexSet;
use regex::RegexBuilder;
use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::{Arc, Mutex, Weak};

/// Bound for per-filter value types.
pub trait FilterValue: ItemBound + Eq + Hash {}
impl<V> FilterValue for V where V: ItemBound + Eq + Hash {}

type TestFn<T, V> = Arc<dyn Fn(&T, &V) -> bool + Send + Sync>;
type EncodeFn<V> = Arc<dyn Fn(&V) -> String + Send + Sync>;
type DecodeFn<V> = Arc<dyn Fn(&str) -> Option<V> + Send + Sync>;

/// String codec that lets a filter's values take part in snapshots.
///
/// Filters constructed with [`Filter::stringly`] get one automatically;
/// other value types supply their own or sit out serialisation.
pub struct ValueCodec<V> {
    encode: EncodeFn<V>,
    decode: DecodeFn<V>,
}

impl<V> Clone for ValueCodec<V> {
    fn clone(&self) -> Self {
        Self {
            encode: Arc::clone(&self.encode),
            decode: Arc::clone(&self.decode),
        }
    }
}

impl<V> ValueCodec<V> {
    /// Build a codec from an encode and a decode closure. `decode` returns
    /// `None` for unparseable input, which is skipped on restore.
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&V) -> String + Send + Sync + 'static,
        D: Fn(&str) -> Option<V> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }

    /// The codec for any `ToString + FromStr` value type.
    #[must_use]
    pub fn stringly() -> Self
    where
        V: ToString + FromStr,
    {
        Self::new(|v: &V| v.to_string(), |s| V::from_str(s).ok())
    }
}

struct FilterInner<T, V> {
    id: String,
    test: TestFn<T, V>,
    // Shared snapshot: `apply` clones the Arc, mutators copy-on-write, so
    // evaluation never runs user callbacks under the lock.
    values: Arc<IndexSet<V>>,
    codec: Option<ValueCodec<V>>,
}

/// A typed filter: id + predicate + ordered set of active values.
///
/// Semantics: an item passes iff the filter has no active values, or at
/// least one active value tests true (OR within a filter).
///
/// `Filter` is a cheap handle; keep a clone to mutate values after handing
/// the filter to a [`FilterManager`].
///
/// # Example
/// ```
/// use slotline::Filter;
///
/// let by_len: Filter<String, usize> =
///     Filter::stringly("len", |s: &String, n: &usize| s.len() == *n);
///
/// assert!(by_len.apply(&"anything".to_string())); // no values: pass-through
/// by_len.add_value(3);
/// by_len.add_value(5);
/// assert!(by_len.apply(&"abc".to_string()));
/// assert!(!by_len.apply(&"abcd".to_string()));
/// ```
pub struct Filter<T, V> {
    inner: Arc<Mutex<FilterInner<T, V>>>,
    emitter: ChangeEmitter,
}

impl<T, V> Clone for Filter<T, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: ItemBound, V: FilterValue> Filter<T, V> {
    /// Create a filter with no string codec; its values will be skipped by
    /// snapshot capture (documented loss).
    pub fn new<F>(id: impl Into<String>, test: F) -> Self
    where
        F: Fn(&T, &V) -> bool + Send + Sync + 'static,
    {
        Self::build(id.into(), Arc::new(test), None)
    }

    /// Create a filter whose values round-trip through strings
    /// automatically.
    pub fn stringly<F>(id: impl Into<String>, test: F) -> Self
    where
        F: Fn(&T, &V) -> bool + Send + Sync + 'static,
        V: ToString + FromStr,
    {
        Self::build(id.into(), Arc::new(test), Some(ValueCodec::stringly()))
    }

    /// Create a filter with an explicit value codec.
    pub fn with_codec<F>(id: impl Into<String>, test: F, codec: ValueCodec<V>) -> Self
    where
        F: Fn(&T, &V) -> bool + Send + Sync + 'static,
    {
        Self::build(id.into(), Arc::new(test), Some(codec))
    }

    fn build(id: String, test: TestFn<T, V>, codec: Option<ValueCodec<V>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FilterInner {
                id,
                test,
                values: Arc::new(IndexSet::new()),
                codec,
            })),
            emitter: ChangeEmitter::new(),
        }
    }

    /// The filter's id.
    #[must_use]
    pub fn id(&self) -> String {
        self.inner.lock().unwrap().id.clone()
    }

    /// Activate a value. No-op (and no notification) if already active.
    pub fn add_value(&self, value: V) {
        let inserted = {
            let mut g = self.inner.lock().unwrap();
            Arc::make_mut(&mut g.values).insert(value)
        };
        if inserted {
            self.emitter.notify();
        }
    }

    /// Deactivate a value. No-op if it was not active.
    pub fn remove_value(&self, value: &V) {
        let removed = {
            let mut g = self.inner.lock().unwrap();
            Arc::make_mut(&mut g.values).shift_remove(value)
        };
        if removed {
            self.emitter.notify();
        }
    }

    /// Replace the whole active set in one notification.
    pub fn set_values<I: IntoIterator<Item = V>>(&self, values: I) {
        let new: IndexSet<V> = values.into_iter().collect();
        let changed = {
            let mut g = self.inner.lock().unwrap();
            if *g.values == new {
                false
            } else {
                g.values = Arc::new(new);
                true
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Deactivate every value.
    pub fn clear_values(&self) {
        let had_values = {
            let mut g = self.inner.lock().unwrap();
            let had = !g.values.is_empty();
            if had {
                g.values = Arc::new(IndexSet::new());
            }
            had
        };
        if had_values {
            self.emitter.notify();
        }
    }

    /// True if `value` is active.
    #[must_use]
    pub fn contains(&self, value: &V) -> bool {
        self.inner.lock().unwrap().values.contains(value)
    }

    /// True if no values are active (the filter passes everything).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().values.is_empty()
    }

    /// Snapshot of the active values in activation order.
    #[must_use]
    pub fn values(&self) -> Vec<V> {
        self.inner.lock().unwrap().values.iter().cloned().collect()
    }

    /// Evaluate the filter against one item.
    #[must_use]
    pub fn apply(&self, item: &T) -> bool {
        let (test, values) = {
            let g = self.inner.lock().unwrap();
            (Arc::clone(&g.test), Arc::clone(&g.values))
        };
        values.is_empty() || values.iter().any(|v| test(item, v))
    }

    /// Register a change listener on this filter.
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
}

/// Object-safe view of a filter, independent of its value type.
///
/// This is what [`FilterManager`] stores; user code normally keeps the typed
/// [`Filter`] handle and never touches this trait directly.
pub trait DynFilter<T>: Send + Sync {
    /// The filter's id.
    fn id(&self) -> String;
    /// Evaluate against one item.
    fn apply(&self, item: &T) -> bool;
    /// True if the filter has active values (i.e. actually constrains).
    fn is_active(&self) -> bool;
    /// Deactivate every value.
    fn clear_values(&self);
    /// Active values as strings, or `None` if the filter has no codec.
    fn capture_values(&self) -> Option<Vec<String>>;
    /// Replace the active set from strings. Returns `false` (leaving state
    /// unchanged) if the filter has no codec.
    fn restore_values(&self, values: &[String]) -> bool;
    /// The filter's change emitter.
    fn emitter(&self) -> &ChangeEmitter;
}

impl<T: ItemBound, V: FilterValue> DynFilter<T> for Filter<T, V> {
    fn id(&self) -> String {
        self.id()
    }

    fn apply(&self, item: &T) -> bool {
        self.apply(item)
    }

    fn is_active(&self) -> bool {
        !self.is_empty()
    }

    fn clear_values(&self) {
        self.clear_values();
    }

    fn capture_values(&self) -> Option<Vec<String>> {
        let (values, codec) = {
            let g = self.inner.lock().unwrap();
            (Arc::clone(&g.values), g.codec.clone()?)
        };
        Some(values.iter().map(|v| (codec.encode)(v)).collect())
    }

    fn restore_values(&self, values: &[String]) -> bool {
        let codec = {
            let g = self.inner.lock().unwrap();
            match g.codec.clone() {
                Some(codec) => codec,
                None => return false,
            }
        };
        let new: IndexSet<V> = values.iter().filter_map(|s| (codec.decode)(s)).collect();
        let changed = {
            let mut g = self.inner.lock().unwrap();
            if *g.values == new {
                false
            } else {
                g.values = Arc::new(new);
                true
            }
        };
        if changed {
            self.emitter.notify();
        }
        true
    }

    fn emitter(&self) -> &ChangeEmitter {
        &self.emitter
    }
}

struct FilterEntry<T> {
    filter: Arc<dyn DynFilter<T>>,
    sub: Subscription,
}

struct ManagerInner<T> {
    filters: indexmap::IndexMap<String, FilterEntry<T>>,
    restoring: bool,
}

/// The filter registry: AND across filters, OR within each filter's values.
///
/// An empty manager accepts everything; so does a manager whose filters all
/// have empty value sets.
///
/// # Example
/// ```
/// use slotline::{Filter, FilterManager};
///
/// let cat: Filter<(&str, u8), String> =
///     Filter::stringly("cat", |it: &(&str, u8), v: &String| it.0 == v);
/// let prio: Filter<(&str, u8), u8> =
///     Filter::stringly("prio", |it: &(&str, u8), v: &u8| it.1 == *v);
///
/// let manager = FilterManager::new();
/// manager.add(cat.clone());
/// manager.add(prio.clone());
///
/// cat.add_value("a".to_string());
/// prio.add_value(1);
///
/// assert!(manager.apply(&("a", 1)));
/// assert!(!manager.apply(&("a", 2)));
/// assert!(!manager.apply(&("b", 1)));
/// ```
pub struct FilterManager<T> {
    inner: Arc<Mutex<ManagerInner<T>>>,
    emitter: ChangeEmitter,
}

impl<T> Clone for FilterManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<T: ItemBound> Default for FilterManager<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ItemBound> FilterManager<T> {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManagerInner {
                filters: indexmap::IndexMap::new(),
                restoring: false,
            })),
            emitter: ChangeEmitter::new(),
        }
    }

    /// Register a filter. A filter with the same id replaces the previous
    /// registration. Notifies once.
    pub fn add<F>(&self, filter: F)
    where
        F: DynFilter<T> + 'static,
    {
        self.add_dyn(Arc::new(filter));
    }

    /// Register several filters in one notification.
    pub fn add_all<I, F>(&self, filters: I)
    where
        I: IntoIterator<Item = F>,
        F: DynFilter<T> + 'static,
    {
        let mut any = false;
        for filter in filters {
            self.insert(Arc::new(filter));
            any = true;
        }
        if any {
            self.emitter.notify();
        }
    }

    fn add_dyn(&self, filter: Arc<dyn DynFilter<T>>) {
        self.insert(filter);
        self.emitter.notify();
    }

    fn insert(&self, filter: Arc<dyn DynFilter<T>>) {
        let id = filter.id();
        let weak = Arc::downgrade(&self.inner);
        let re_emit = self.emitter.clone();
        let handle = filter.emitter().add_listener(move || {
            if let Some(inner) = Weak::upgrade(&weak) {
                if inner.lock().unwrap().restoring {
                    return;
                }
                re_emit.notify();
            }
        });
        let sub = Subscription::new(filter.emitter().clone(), handle);
        let mut g = self.inner.lock().unwrap();
        if let Some(old) = g.filters.insert(id, FilterEntry { filter, sub }) {
            old.sub.unsubscribe();
        }
    }

    /// Deregister a filter by id. Returns the filter if it was registered.
    pub fn remove(&self, id: &str) -> Option<Arc<dyn DynFilter<T>>> {
        let entry = self.inner.lock().unwrap().filters.shift_remove(id)?;
        entry.sub.unsubscribe();
        self.emitter.notify();
        Some(entry.filter)
    }

    /// Deregister every filter.
    pub fn clear(&self) {
        let entries: Vec<FilterEntry<T>> = {
            let mut g = self.inner.lock().unwrap();
            g.filters.drain(..).map(|(_, e)| e).collect()
        };
        if entries.is_empty() {
            return;
        }
        for entry in &entries {
            entry.sub.unsubscribe();
        }
        self.emitter.notify();
    }

    /// True iff every registered filter accepts the item. An empty manager
    /// accepts everything.
    #[must_use]
    pub fn apply(&self, item: &T) -> bool {
        self.filters().iter().all(|f| f.apply(item))
    }

    /// Snapshot the registry into a standalone predicate.
    ///
    /// The controller uses this during rebuild so the manager lock is taken
    /// once per rebuild, not once per item.
    #[must_use]
    pub fn predicate(&self) -> impl Fn(&T) -> bool + use<T> {
        let filters = self.filters();
        move |item| filters.iter().all(|f| f.apply(item))
    }

    /// Handles of all registered filters, in registration order.
    #[must_use]
    pub fn filters(&self) -> Vec<Arc<dyn DynFilter<T>>> {
        self.inner
            .lock()
            .unwrap()
            .filters
            .values()
            .map(|e| Arc::clone(&e.filter))
            .collect()
    }

    /// Ids of all registered filters, in registration order.
    #[must_use]
    pub fn filter_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().filters.keys().cloned().collect()
    }

    /// The registered filter with the given id.
    #[must_use]
    pub fn by_id(&self, id: &str) -> Option<Arc<dyn DynFilter<T>>> {
        self.inner
            .lock()
            .unwrap()
            .filters
            .get(id)
            .map(|e| Arc::clone(&e.filter))
    }

    /// Number of registered filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().filters.len()
    }

    /// True if no filters are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().filters.is_empty()
    }

    /// Capture the active criteria of every codec-bearing filter.
    ///
    /// Filters without a codec, and filters with no active values, are
    /// omitted.
    #[must_use]
    pub fn capture_state(&self) -> FilterSnapshot {
        let criteria = self
            .filters()
            .iter()
            .filter(|f| f.is_active())
            .filter_map(|f| {
                f.capture_values().map(|values| FilterCriteria {
                    id: f.id(),
                    values,
                })
            })
            .collect();
        FilterSnapshot { criteria }
    }

    /// Restore every filter from a snapshot: mentioned filters get the
    /// snapshot's values, all others are cleared. Notifies once.
    pub fn restore_state(&self, snapshot: &FilterSnapshot) {
        let filters = self.filters();
        self.inner.lock().unwrap().restoring = true;
        for filter in &filters {
            match snapshot.criteria.iter().find(|c| c.id == filter.id()) {
                Some(criteria) => {
                    filter.restore_values(&criteria.values);
                }
                None => filter.clear_values(),
            }
        }
        self.inner.lock().unwrap().restoring = false;
        self.emitter.notify();
    }

    /// Register a change listener on the manager. Fires for registry changes
    /// and for value changes of any registered filter.
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

    /// Drop all listeners and unsubscribe from every registered filter.
    pub fn dispose(&self) {
        let mut g = self.inner.lock().unwrap();
        for entry in g.filters.values() {
            entry.sub.unsubscribe();
        }
        g.filters.clear();
        drop(g);
        self.emitter.dispose();
    }
}

/// A boolean combination of filters, evaluated against single items.
///
/// `Ref` delegates to the referred filter's *current* state, so an
/// expression stays live as values change.
///
/// # Example
/// ```
/// use slotline::{Filter, FilterExpr};
///
/// let short: Filter<String, usize> =
///     Filter::stringly("short", |s: &String, n: &usize| s.len() <= *n);
/// short.add_value(3);
///
/// let expr = FilterExpr::not(FilterExpr::refer(short.clone()));
/// assert!(!expr.eval(&"abc".to_string()));
/// assert!(expr.eval(&"abcdef".to_string()));
/// ```
pub enum FilterExpr<T> {
    /// True iff every sub-expression is true (empty: true).
    And(Vec<FilterExpr<T>>),
    /// True iff any sub-expression is true (empty: false).
    Or(Vec<FilterExpr<T>>),
    /// Negation.
    Not(Box<FilterExpr<T>>),
    /// Delegate to a filter's current `apply`.
    Ref(Arc<dyn DynFilter<T>>),
}

impl<T> Clone for FilterExpr<T> {
    fn clone(&self) -> Self {
        match self {
            Self::And(xs) => Self::And(xs.clone()),
            Self::Or(xs) => Self::Or(xs.clone()),
            Self::Not(x) => Self::Not(x.clone()),
            Self::Ref(f) => Self::Ref(Arc::clone(f)),
        }
    }
}

impl<T: ItemBound> FilterExpr<T> {
    /// Conjunction of sub-expressions.
    #[must_use]
    pub fn and(exprs: Vec<Self>) -> Self {
        Self::And(exprs)
    }

    /// Disjunction of sub-expressions.
    #[must_use]
    pub fn or(exprs: Vec<Self>) -> Self {
        Self::Or(exprs)
    }

    /// Negation of `expr`.
    #[must_use]
    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }

    /// Reference a filter's live state.
    #[must_use]
    pub fn refer<F>(filter: F) -> Self
    where
        F: DynFilter<T> + 'static,
    {
        Self::Ref(Arc::new(filter))
    }

    /// Evaluate the expression against one item.
    #[must_use]
    pub fn eval(&self, item: &T) -> bool {
        match self {
            Self::And(xs) => xs.iter().all(|x| x.eval(item)),
            Self::Or(xs) => xs.iter().any(|x| x.eval(item)),
            Self::Not(x) => !x.eval(item),
            Self::Ref(f) => f.apply(item),
        }
    }
}

/// Case-insensitive substring search over user-extracted text.
///
/// Each active value is a needle; an item passes if any needle occurs in its
/// extracted text (or if no needles are active).
///
/// # Example
/// ```
/// use slotline::text_filter;
///
/// let search = text_filter("q", |s: &String| s.clone());
/// search.add_value("QUICK".to_string());
/// assert!(search.apply(&"the quick fox".to_string()));
/// assert!(!search.apply(&"the slow fox".to_string()));
/// ```
pub fn text_filter<T, F>(id: impl Into<String>, extract: F) -> Filter<T, String>
where
    T: ItemBound,
    F: Fn(&T) -> String + Send + Sync + 'static,
{
    Filter::stringly(id, move |item: &T, needle: &String| {
        extract(item).to_lowercase().contains(&needle.to_lowercase())
    })
}

/// Regex search over user-extracted text.
///
/// Each active value is compiled as a case-insensitive regex (compilations
/// are cached per pattern). A value that fails to compile is matched as a
/// literal instead.
pub fn regex_filter<T, F>(id: impl Into<String>, extract: F) -> Filter<T, String>
where
    T: ItemBound,
    F: Fn(&T) -> String + Send + Sync + 'static,
{
    let cache: Arc<Mutex<HashMap<String, regex::Regex>>> = Arc::new(Mutex::new(HashMap::new()));
    Filter::stringly(id, move |item: &T, pattern: &String| {
        let re = {
            let mut cache = cache.lock().unwrap();
            if let Some(re) = cache.get(pattern) {
                re.clone()
            } else {
                let compiled = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .or_else(|_| {
                        RegexBuilder::new(&regex::escape(pattern))
                            .case_insensitive(true)
                            .build()
                    });
                match compiled {
                    Ok(re) => {
                        cache.insert(pattern.clone(), re.clone());
                        re
                    }
                    Err(_) => return false,
                }
            }
        };
        re.is_match(&extract(item))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codecless_filters_sit_out_serialisation() {
        #[derive(Clone, PartialEq, Eq, Hash)]
        struct Opaque(u8);

        let filter: Filter<u8, Opaque> = Filter::new("opaque", |n: &u8, v: &Opaque| *n == v.0);
        filter.add_value(Opaque(1));

        let erased: &dyn DynFilter<u8> = &filter;
        assert!(erased.is_active());
        assert_eq!(erased.capture_values(), None);
        assert!(!erased.restore_values(&["1".to_string()]));
        assert!(filter.contains(&Opaque(1)), "failed restore leaves values alone");
    }

    #[test]
    fn custom_codecs_skip_undecodable_values() {
        let codec = ValueCodec::new(
            |v: &u8| format!("#{v}"),
            |s| s.strip_prefix('#').and_then(|rest| rest.parse().ok()),
        );
        let filter: Filter<u8, u8> = Filter::with_codec("n", |a: &u8, b: &u8| a == b, codec);
        filter.add_value(7);

        let erased: &dyn DynFilter<u8> = &filter;
        assert_eq!(erased.capture_values(), Some(vec!["#7".to_string()]));

        assert!(erased.restore_values(&["#3".to_string(), "junk".to_string()]));
        assert_eq!(filter.values(), vec![3]);
    }

    #[test]
    fn values_keep_activation_order() {
        let filter: Filter<u8, u8> = Filter::stringly("n", |a: &u8, b: &u8| a == b);
        filter.add_value(3);
        filter.add_value(1);
        filter.add_value(2);
        assert_eq!(filter.values(), vec![3, 1, 2]);

        filter.remove_value(&1);
        assert_eq!(filter.values(), vec![3, 2]);
    }

    #[test]
    fn set_values_with_the_same_set_is_silent() {
        let filter: Filter<u8, u8> = Filter::stringly("n", |a: &u8, b: &u8| a == b);
        filter.set_values([1, 2]);

        let counter = crate::testing::ChangeCounter::new();
        filter.add_listener(counter.callback());
        filter.set_values([1, 2]);
        assert_eq!(counter.count(), 0);
        filter.set_values([2, 1]);
        assert_eq!(counter.count(), 1, "order is part of the value set");
    }
}
