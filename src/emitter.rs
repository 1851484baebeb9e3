//! The observer primitive every stateful component is built on.
//!
//! A [`ChangeEmitter`] is a registry of no-argument callbacks. Components
//! mutate their state first and call [`notify`](ChangeEmitter::notify)
//! afterwards; consumers query state from inside the callback. Callbacks
//! carry no payload on purpose: the engine's state is cheap to re-read, and
//! payload-free events compose across managers without translation.
//!
//! # Re-entrancy
//!
//! `notify` snapshots the listener list before iterating, so a listener may
//! freely add or remove listeners (including itself) while a notification is
//! in flight; such changes take effect from the *next* `notify`.
//!
//! # Fault policy
//!
//! A panicking listener does not prevent later listeners from running. Every
//! listener in the snapshot runs; the payload of the *first* panic is then
//! re-raised from `notify` (first-fault policy).
//!
//! The emitter is a cheaply cloneable handle; clones share the same listener
//! registry.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::{Arc, Mutex};

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Opaque registration handle returned by
/// [`add_listener`](ChangeEmitter::add_listener).
///
/// Handles are small, `Copy`, and only meaningful to the emitter that issued
/// them. Registering the same closure twice yields two distinct handles, and
/// the closure runs twice per notification.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ListenerHandle(u64);

struct EmitterInner {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
    disposed: bool,
}

/// A registry of change listeners with snapshot-based notification.
///
/// # Example
/// ```
/// use slotline::ChangeEmitter;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let emitter = ChangeEmitter::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let h = {
///     let hits = Arc::clone(&hits);
///     emitter.add_listener(move || {
///         hits.fetch_add(1, Ordering::SeqCst);
///     })
/// };
///
/// emitter.notify();
/// emitter.notify();
/// assert_eq!(hits.load(Ordering::SeqCst), 2);
///
/// emitter.remove_listener(h);
/// emitter.notify();
/// assert_eq!(hits.load(Ordering::SeqCst), 2);
/// ```
pub struct ChangeEmitter {
    inner: Arc<Mutex<EmitterInner>>,
}

impl Default for ChangeEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ChangeEmitter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for ChangeEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let g = self.inner.lock().unwrap();
        f.debug_struct("ChangeEmitter")
            .field("listeners", &g.listeners.len())
            .field("disposed", &g.disposed)
            .finish()
    }
}

impl ChangeEmitter {
    /// Create an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EmitterInner {
                next_id: 0,
                listeners: Vec::new(),
                disposed: false,
            })),
        }
    }

    /// Register a listener and return its handle.
    ///
    /// Listeners run in registration order. On a disposed emitter this is a
    /// no-op that still returns a (dead) handle.
    pub fn add_listener<F>(&self, f: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut g = self.inner.lock().unwrap();
        let id = g.next_id;
        g.next_id += 1;
        if !g.disposed {
            g.listeners.push((id, Arc::new(f)));
        }
        ListenerHandle(id)
    }

    /// Remove a previously registered listener.
    ///
    /// Returns `true` if the handle was registered. Removing twice is a
    /// harmless no-op.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut g = self.inner.lock().unwrap();
        let before = g.listeners.len();
        g.listeners.retain(|(id, _)| *id != handle.0);
        g.listeners.len() != before
    }

    /// Invoke every registered listener once, in registration order.
    ///
    /// The listener list is snapshotted first, so listeners may mutate the
    /// registry mid-notification. See the module docs for the fault policy.
    pub fn notify(&self) {
        let snapshot: Vec<Listener> = {
            let g = self.inner.lock().unwrap();
            if g.disposed {
                return;
            }
            g.listeners.iter().map(|(_, f)| Arc::clone(f)).collect()
        };

        let mut first_fault = None;
        for listener in snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener())) {
                if first_fault.is_none() {
                    first_fault = Some(payload);
                }
            }
        }
        if let Some(payload) = first_fault {
            resume_unwind(payload);
        }
    }

    /// Number of currently registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.lock().unwrap().listeners.len()
    }

    /// True once [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.lock().unwrap().disposed
    }

    /// Drop all listeners and turn every subsequent `notify` into a no-op.
    ///
    /// Idempotent.
    pub fn dispose(&self) {
        let mut g = self.inner.lock().unwrap();
        g.disposed = true;
        g.listeners.clear();
    }
}

/// An emitter subscription held by a downstream component.
///
/// Pairs the upstream emitter with the handle it issued so the subscription
/// can be severed on disposal. Dropping the guard does *not* unsubscribe;
/// call [`unsubscribe`](Subscription::unsubscribe) explicitly.
pub(crate) struct Subscription {
    emitter: ChangeEmitter,
    handle: ListenerHandle,
}

impl Subscription {
    pub(crate) fn new(emitter: ChangeEmitter, handle: ListenerHandle) -> Self {
        Self { emitter, handle }
    }

    pub(crate) fn unsubscribe(&self) {
        self.emitter.remove_listener(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let clone = Arc::clone(&hits);
        (hits, move || {
            clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn same_closure_registered_twice_runs_twice() {
        let emitter = ChangeEmitter::new();
        let (hits, listener) = counter();
        let listener = Arc::new(listener);
        let a = Arc::clone(&listener);
        let b = Arc::clone(&listener);
        emitter.add_listener(move || a());
        emitter.add_listener(move || b());
        emitter.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn listener_may_remove_itself_during_notify() {
        let emitter = ChangeEmitter::new();
        let (hits, listener) = counter();
        let slot: Arc<Mutex<Option<ListenerHandle>>> = Arc::new(Mutex::new(None));
        let slot2 = Arc::clone(&slot);
        let em2 = emitter.clone();
        let handle = emitter.add_listener(move || {
            listener();
            if let Some(h) = slot2.lock().unwrap().take() {
                em2.remove_listener(h);
            }
        });
        *slot.lock().unwrap() = Some(handle);

        emitter.notify();
        emitter.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispose_silences_notify() {
        let emitter = ChangeEmitter::new();
        let (hits, listener) = counter();
        emitter.add_listener(listener);
        emitter.dispose();
        emitter.notify();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(emitter.listener_count(), 0);
        assert!(emitter.is_disposed());
    }
}
