//! Scoped tri-state selection over opaque item keys.
//!
//! A [`SelectionManager`] stores which keys are selected, partitioned into
//! named *scopes* so independent selection sets (say, two checkbox columns)
//! can coexist. Single keys are definitely on or off; aggregate queries over
//! many keys answer with a [`Tristate`], which is how group headers render
//! their checkboxes.
//!
//! Every mutating call notifies at most once; calls that change nothing do
//! not notify.

use crate::emitter::{ChangeEmitter, ListenerHandle};
use crate::node::KeyBound;
use crate::tristate::Tristate;
use indexmap::{IndexMap, IndexSet};
use std::sync::{Arc, Mutex};

/// The scope used by the unsuffixed methods.
pub const DEFAULT_SCOPE: &str = "";

struct SelectionInner<K> {
    scopes: IndexMap<String, IndexSet<K>>,
}

/// Tracks selected keys per scope and aggregates them into tri-states.
///
/// # Example
/// ```
/// use slotline::{SelectionManager, Tristate};
///
/// let selection: SelectionManager<u32> = SelectionManager::new();
/// selection.select(1, true);
/// selection.select(2, true);
///
/// assert!(selection.is_selected(&1));
/// assert_eq!(selection.state_of(&[1, 2]), Tristate::Yes);
/// assert_eq!(selection.state_of(&[1, 3]), Tristate::Mixed);
/// assert_eq!(selection.state_of(&[3, 4]), Tristate::No);
/// assert_eq!(selection.count(), 2);
/// ```
pub struct SelectionManager<K> {
    inner: Arc<Mutex<SelectionInner<K>>>,
    emitter: ChangeEmitter,
}

impl<K> Clone for SelectionManager<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl<K: KeyBound> Default for SelectionManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeyBound> SelectionManager<K> {
    /// Create a manager with nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SelectionInner {
                scopes: IndexMap::new(),
            })),
            emitter: ChangeEmitter::new(),
        }
    }

    /// Select or deselect a key in the default scope.
    pub fn select(&self, key: K, selected: bool) {
        self.select_in(DEFAULT_SCOPE, key, selected);
    }

    /// Select or deselect a key in a scope.
    pub fn select_in(&self, scope: &str, key: K, selected: bool) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            let set = g.scopes.entry(scope.to_string()).or_default();
            if selected {
                set.insert(key)
            } else {
                set.shift_remove(&key)
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Select every key in the default scope, notifying once.
    pub fn select_all<I: IntoIterator<Item = K>>(&self, keys: I) {
        self.select_all_in(DEFAULT_SCOPE, keys);
    }

    /// Select every key in a scope, notifying once.
    pub fn select_all_in<I: IntoIterator<Item = K>>(&self, scope: &str, keys: I) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            let set = g.scopes.entry(scope.to_string()).or_default();
            let mut any = false;
            for key in keys {
                any |= set.insert(key);
            }
            any
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Deselect every key in the default scope, notifying once.
    pub fn deselect_all<'a, I: IntoIterator<Item = &'a K>>(&self, keys: I) {
        self.deselect_all_in(DEFAULT_SCOPE, keys);
    }

    /// Deselect every key in a scope, notifying once.
    pub fn deselect_all_in<'a, I: IntoIterator<Item = &'a K>>(&self, scope: &str, keys: I) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            match g.scopes.get_mut(scope) {
                Some(set) => {
                    let mut any = false;
                    for key in keys {
                        any |= set.shift_remove(key);
                    }
                    any
                }
                None => false,
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Deselect everything in every scope.
    pub fn clear_all(&self) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            let had = g.scopes.values().any(|s| !s.is_empty());
            g.scopes.clear();
            had
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Deselect everything in one scope.
    pub fn clear_scope(&self, scope: &str) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            match g.scopes.get_mut(scope) {
                Some(set) if !set.is_empty() => {
                    set.clear();
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// True if the key is selected in the default scope.
    #[must_use]
    pub fn is_selected(&self, key: &K) -> bool {
        self.is_selected_in(DEFAULT_SCOPE, key)
    }

    /// True if the key is selected in a scope.
    #[must_use]
    pub fn is_selected_in(&self, scope: &str, key: &K) -> bool {
        self.inner
            .lock()
            .unwrap()
            .scopes
            .get(scope)
            .is_some_and(|set| set.contains(key))
    }

    /// Aggregate state of several keys in the default scope.
    #[must_use]
    pub fn state_of(&self, keys: &[K]) -> Tristate {
        self.state_of_in(DEFAULT_SCOPE, keys)
    }

    /// Aggregate state of several keys in a scope: `Yes` if all are
    /// selected, `No` if none (or `keys` is empty), `Mixed` otherwise.
    #[must_use]
    pub fn state_of_in(&self, scope: &str, keys: &[K]) -> Tristate {
        let g = self.inner.lock().unwrap();
        let set = g.scopes.get(scope);
        Tristate::of_all(
            keys.iter()
                .map(|k| set.is_some_and(|s| s.contains(k))),
        )
    }

    /// Number of selected keys in the default scope.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count_in(DEFAULT_SCOPE)
    }

    /// Number of selected keys in a scope.
    #[must_use]
    pub fn count_in(&self, scope: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .scopes
            .get(scope)
            .map_or(0, IndexSet::len)
    }

    /// Selected keys in the default scope, in selection order.
    #[must_use]
    pub fn selected_keys(&self) -> Vec<K> {
        self.selected_keys_in(DEFAULT_SCOPE)
    }

    /// Selected keys in a scope, in selection order.
    #[must_use]
    pub fn selected_keys_in(&self, scope: &str) -> Vec<K> {
        self.inner
            .lock()
            .unwrap()
            .scopes
            .get(scope)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of scopes that have ever been written to.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.inner.lock().unwrap().scopes.keys().cloned().collect()
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

    /// Drop all listeners.
    pub fn dispose(&self) {
        self.emitter.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_are_listed_once_written() {
        let selection: SelectionManager<u8> = SelectionManager::new();
        assert!(selection.scopes().is_empty());

        selection.select(1, true);
        selection.select_in("aux", 2, true);
        assert_eq!(
            selection.scopes(),
            vec![DEFAULT_SCOPE.to_string(), "aux".to_string()]
        );
    }

    #[test]
    fn unknown_scopes_read_as_empty() {
        let selection: SelectionManager<u8> = SelectionManager::new();
        assert!(!selection.is_selected_in("ghost", &1));
        assert_eq!(selection.count_in("ghost"), 0);
        assert_eq!(selection.state_of_in("ghost", &[1, 2]), Tristate::No);
        assert!(selection.selected_keys_in("ghost").is_empty());
    }
}
