//! Per-edge pagination state machine with load hints.
//!
//! The engine performs no I/O. Callers wrap their own fetch in
//! [`start_loading`](PaginationState::start_loading) →
//! [`complete`](PaginationState::complete) /
//! [`fail`](PaginationState::fail); the state machine enforces at-most-one
//! in-flight load per edge id and remembers where the next load should
//! resume from.
//!
//! Per edge id the status moves through:
//!
//! ```text
//!          start_loading
//!   idle ───────────────▶ loading
//!    ▲                      │
//!    │ complete(has-more)   │ complete(end / None)
//!    │                      ▼
//!    └────── reset ───── exhausted
//!
//!   loading ── fail ──▶ error ── start_loading (retry) ──▶ loading
//! ```
//!
//! `exhausted` is terminal until `reset`. A *hint* is a cheap "more may
//! exist" signal recorded before any real load; exhausting an edge clears
//! its hint.
//!
//! Calls that reach an edge in the wrong status (`complete` on an edge that
//! is not loading, a completion token of the wrong shape) are warn-only
//! no-ops: state is unchanged, nothing notifies, and the optional
//! [diagnostic hook](PaginationState::set_diagnostic_hook) receives a
//! description. Rejecting with an error would force every async caller to
//! handle races it cannot avoid.

use crate::emitter::{ChangeEmitter, ListenerHandle};
use crate::error::Error;
use crate::snapshot::PaginationSnapshot;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

macro_rules! reserved_edges {
    ($($name:ident),* $(,)?) => {
        ::paste::paste! {
            $(
                #[doc = concat!("Reserved `", stringify!($name), "` pagination edge id.")]
                pub const [<EDGE_ $name:upper>]: &str = stringify!($name);
            )*

            /// Every reserved edge id, in canonical order.
            ///
            /// Custom edge ids are arbitrary strings; avoiding collisions
            /// with these is the caller's responsibility.
            pub const RESERVED_EDGE_IDS: &[&str] = &[$(stringify!($name)),*];
        }
    };
}

reserved_edges!(leading, trailing, top, bottom, left, right);

/// Where the next page load should resume from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageToken {
    /// Nothing loaded yet.
    Empty,
    /// The edge is exhausted; no further loads.
    End,
    /// Numeric offset cursor, optionally with a known total.
    Offset {
        /// Items already consumed from this edge.
        offset: u64,
        /// Total item count, when the source reports one.
        total: Option<u64>,
    },
    /// Opaque continuation cursor issued by the source.
    Cursor(String),
}

impl PageToken {
    /// An offset token with no known total.
    #[must_use]
    pub const fn offset(offset: u64) -> Self {
        Self::Offset {
            offset,
            total: None,
        }
    }

    /// An offset token with a known total.
    #[must_use]
    pub const fn offset_of(offset: u64, total: u64) -> Self {
        Self::Offset {
            offset,
            total: Some(total),
        }
    }

    /// A cursor token.
    #[must_use]
    pub fn cursor(cursor: impl Into<String>) -> Self {
        Self::Cursor(cursor.into())
    }

    /// True unless the token is [`PageToken::End`].
    #[must_use]
    pub const fn has_more(&self) -> bool {
        !matches!(self, Self::End)
    }

    /// The numeric offset, for offset tokens.
    #[must_use]
    pub const fn as_offset(&self) -> Option<u64> {
        match self {
            Self::Offset { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// The status component of an [`EdgeState`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EdgeStatus {
    /// Registered, not currently loading.
    Idle,
    /// A load is in flight.
    Loading,
    /// The last load failed; retry is allowed.
    Error,
    /// The edge reported its end; only `reset` leaves this state.
    Exhausted,
}

/// Full load state of one pagination edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeState {
    /// Current status.
    pub status: EdgeStatus,
    /// Resume token for the next load.
    pub token: PageToken,
    /// Payload of the last failure, if the status is [`EdgeStatus::Error`].
    pub error: Option<String>,
    /// Number of failures since the last reset.
    pub retry_count: u32,
}

impl Default for EdgeState {
    fn default() -> Self {
        Self {
            status: EdgeStatus::Idle,
            token: PageToken::Empty,
            error: None,
            retry_count: 0,
        }
    }
}

impl EdgeState {
    /// True if a load may start: idle or errored, and the token still has
    /// more.
    #[must_use]
    pub fn can_load(&self) -> bool {
        matches!(self.status, EdgeStatus::Idle | EdgeStatus::Error) && self.token.has_more()
    }
}

type DiagnosticHook = Arc<dyn Fn(&str) + Send + Sync>;

struct PaginationInner {
    edges: IndexMap<String, EdgeState>,
    hints: IndexMap<String, bool>,
    hook: Option<DiagnosticHook>,
}

/// Tracks load state per edge id. Cheap-clone handle.
///
/// # Example
/// ```
/// use slotline::{PageToken, PaginationState, EDGE_TRAILING};
///
/// let pagination = PaginationState::new();
/// pagination.add_edge(EDGE_TRAILING);
///
/// assert!(pagination.start_loading(EDGE_TRAILING));
/// assert!(!pagination.start_loading(EDGE_TRAILING)); // already in flight
///
/// pagination.complete(EDGE_TRAILING, Some(PageToken::offset(20)));
/// assert!(pagination.can_load(EDGE_TRAILING));
///
/// assert!(pagination.start_loading(EDGE_TRAILING));
/// pagination.complete(EDGE_TRAILING, Some(PageToken::End));
/// assert!(pagination.is_exhausted(EDGE_TRAILING));
/// assert!(!pagination.can_load(EDGE_TRAILING));
/// ```
pub struct PaginationState {
    inner: Arc<Mutex<PaginationInner>>,
    emitter: ChangeEmitter,
}

impl Clone for PaginationState {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            emitter: self.emitter.clone(),
        }
    }
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new()
    }
}

impl PaginationState {
    /// Create a state with no registered edges.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PaginationInner {
                edges: IndexMap::new(),
                hints: IndexMap::new(),
                hook: None,
            })),
            emitter: ChangeEmitter::new(),
        }
    }

    fn diag(&self, message: &str) {
        let hook = self.inner.lock().unwrap().hook.clone();
        if let Some(hook) = hook {
            hook(message);
        }
    }

    /// Install a hook that receives a description of every warn-only no-op.
    pub fn set_diagnostic_hook<F>(&self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.lock().unwrap().hook = Some(Arc::new(hook));
    }

    /// Remove the diagnostic hook.
    pub fn clear_diagnostic_hook(&self) {
        self.inner.lock().unwrap().hook = None;
    }

    // |--------------|
    // | Registration |
    // |--------------|

    /// Register an edge in the idle/empty state. No-op if already known.
    pub fn add_edge(&self, id: &str) {
        let added = {
            let mut g = self.inner.lock().unwrap();
            if g.edges.contains_key(id) {
                false
            } else {
                g.edges.insert(id.to_string(), EdgeState::default());
                true
            }
        };
        if added {
            self.emitter.notify();
        }
    }

    /// Remove an edge, keeping any hint recorded for the id.
    pub fn remove_edge(&self, id: &str) {
        let removed = self.inner.lock().unwrap().edges.shift_remove(id).is_some();
        if removed {
            self.emitter.notify();
        }
    }

    /// Remove an edge and its hint.
    pub fn unregister(&self, id: &str) {
        let removed = {
            let mut g = self.inner.lock().unwrap();
            let edge = g.edges.shift_remove(id).is_some();
            let hint = g.hints.shift_remove(id).is_some();
            edge || hint
        };
        if removed {
            self.emitter.notify();
        }
    }

    /// True if the id has a registered edge.
    #[must_use]
    pub fn is_registered(&self, id: &str) -> bool {
        self.inner.lock().unwrap().edges.contains_key(id)
    }

    /// Registered edge ids in registration order.
    #[must_use]
    pub fn edge_ids(&self) -> Vec<String> {
        self.inner.lock().unwrap().edges.keys().cloned().collect()
    }

    // |-------|
    // | Hints |
    // |-------|

    /// Record a "more may exist" hint for an id (registered or not).
    pub fn set_hint(&self, id: &str, has_more: bool) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            g.hints.insert(id.to_string(), has_more) != Some(has_more)
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Forget the hint for an id.
    pub fn clear_hint(&self, id: &str) {
        let removed = self.inner.lock().unwrap().hints.shift_remove(id).is_some();
        if removed {
            self.emitter.notify();
        }
    }

    /// True if a hint (of either polarity) is recorded for the id.
    #[must_use]
    pub fn has_hint(&self, id: &str) -> bool {
        self.inner.lock().unwrap().hints.contains_key(id)
    }

    /// The recorded hint value, if any.
    #[must_use]
    pub fn get_hint(&self, id: &str) -> Option<bool> {
        self.inner.lock().unwrap().hints.get(id).copied()
    }

    /// Ids whose hint says more may exist.
    #[must_use]
    pub fn hinted_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .hints
            .iter()
            .filter(|(_, more)| **more)
            .map(|(id, _)| id.clone())
            .collect()
    }

    // |-------------|
    // | Transitions |
    // |-------------|

    /// Begin a load. Auto-registers unknown ids.
    ///
    /// Returns `false` — with state unchanged and no notification — if a
    /// load is already in flight or the edge cannot load (exhausted).
    pub fn start_loading(&self, id: &str) -> bool {
        let started = {
            let mut g = self.inner.lock().unwrap();
            let state = g.edges.entry(id.to_string()).or_default();
            if state.status == EdgeStatus::Loading || !state.can_load() {
                false
            } else {
                state.status = EdgeStatus::Loading;
                true
            }
        };
        if started {
            self.emitter.notify();
        }
        started
    }

    /// Finish a load.
    ///
    /// `None` or [`PageToken::End`] exhausts the edge and clears its hint;
    /// any other token returns the edge to idle with that token stored.
    /// Unregistered ids, edges that are not loading, and
    /// [`PageToken::Empty`] tokens are warn-only no-ops; use
    /// [`try_complete`](Self::try_complete) to reject them instead.
    pub fn complete(&self, id: &str, next_token: Option<PageToken>) {
        if let Err(err) = self.try_complete(id, next_token) {
            self.diag(&format!("complete({id}): {err}"));
        }
    }

    /// The strict form of [`complete`](Self::complete).
    ///
    /// # Errors
    /// [`Error::NotFound`] for unregistered ids or edges that are not
    /// loading; [`Error::InvalidToken`] for a [`PageToken::Empty`]
    /// completion. The edge is unchanged and nothing notifies on error.
    pub fn try_complete(&self, id: &str, next_token: Option<PageToken>) -> crate::Result<()> {
        {
            let mut g = self.inner.lock().unwrap();
            let inner = &mut *g;
            match inner.edges.get_mut(id) {
                None => {
                    return Err(Error::NotFound {
                        what: "edge",
                        id: id.to_string(),
                    });
                }
                Some(state) if state.status != EdgeStatus::Loading => {
                    return Err(Error::NotFound {
                        what: "loading edge",
                        id: id.to_string(),
                    });
                }
                Some(state) => match next_token {
                    None | Some(PageToken::End) => {
                        state.status = EdgeStatus::Exhausted;
                        state.token = PageToken::End;
                        state.error = None;
                        inner.hints.shift_remove(id);
                    }
                    Some(PageToken::Empty) => {
                        return Err(Error::InvalidToken {
                            edge: id.to_string(),
                        });
                    }
                    Some(token) => {
                        state.status = EdgeStatus::Idle;
                        state.token = token;
                        state.error = None;
                    }
                },
            }
        }
        self.emitter.notify();
        Ok(())
    }

    /// Record a load failure with an opaque payload; the edge becomes
    /// retryable. Unregistered ids and edges that are not loading are
    /// warn-only no-ops.
    pub fn fail(&self, id: &str, error: impl Into<String>) {
        let applied = {
            let mut g = self.inner.lock().unwrap();
            let Some(state) = g.edges.get_mut(id) else {
                drop(g);
                self.diag(&format!("fail({id}): edge not registered"));
                return;
            };
            if state.status != EdgeStatus::Loading {
                drop(g);
                self.diag(&format!("fail({id}): edge is not loading"));
                return;
            }
            state.status = EdgeStatus::Error;
            state.error = Some(error.into());
            state.retry_count += 1;
            true
        };
        if applied {
            self.emitter.notify();
        }
    }

    /// Return an edge to the idle/empty state, keeping its hint.
    pub fn reset(&self, id: &str) {
        self.reset_keeping_hint(id, true);
    }

    /// Return an edge to the idle/empty state, optionally dropping its hint.
    pub fn reset_keeping_hint(&self, id: &str, keep_hint: bool) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            let Some(state) = g.edges.get_mut(id) else {
                return;
            };
            *state = EdgeState::default();
            if !keep_hint {
                g.hints.shift_remove(id);
            }
            true
        };
        if changed {
            self.emitter.notify();
        }
    }

    /// Reset every registered edge, dropping hints unless told otherwise.
    /// Notifies once.
    pub fn reset_all(&self, keep_hints: bool) {
        let changed = {
            let mut g = self.inner.lock().unwrap();
            if g.edges.is_empty() && (keep_hints || g.hints.is_empty()) {
                false
            } else {
                for state in g.edges.values_mut() {
                    *state = EdgeState::default();
                }
                if !keep_hints {
                    g.hints.clear();
                }
                true
            }
        };
        if changed {
            self.emitter.notify();
        }
    }

    // |---------|
    // | Queries |
    // |---------|

    /// True if a load may start for the id now.
    #[must_use]
    pub fn can_load(&self, id: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .edges
            .get(id)
            .is_some_and(EdgeState::can_load)
    }

    /// True if a load is in flight for the id.
    #[must_use]
    pub fn is_loading(&self, id: &str) -> bool {
        self.status_is(id, EdgeStatus::Loading)
    }

    /// True if the edge has reported its end.
    #[must_use]
    pub fn is_exhausted(&self, id: &str) -> bool {
        self.status_is(id, EdgeStatus::Exhausted)
    }

    /// True if the edge's last load failed.
    #[must_use]
    pub fn has_error(&self, id: &str) -> bool {
        self.status_is(id, EdgeStatus::Error)
    }

    fn status_is(&self, id: &str, status: EdgeStatus) -> bool {
        self.inner
            .lock()
            .unwrap()
            .edges
            .get(id)
            .is_some_and(|s| s.status == status)
    }

    /// The last failure payload for the id.
    #[must_use]
    pub fn get_error(&self, id: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .edges
            .get(id)
            .and_then(|s| s.error.clone())
    }

    /// The resume token for the id.
    #[must_use]
    pub fn get_token(&self, id: &str) -> Option<PageToken> {
        self.inner
            .lock()
            .unwrap()
            .edges
            .get(id)
            .map(|s| s.token.clone())
    }

    /// Full state of the edge.
    #[must_use]
    pub fn get_state(&self, id: &str) -> Option<EdgeState> {
        self.inner.lock().unwrap().edges.get(id).cloned()
    }

    /// Failures since the last reset for the id.
    #[must_use]
    pub fn retry_count(&self, id: &str) -> u32 {
        self.inner
            .lock()
            .unwrap()
            .edges
            .get(id)
            .map_or(0, |s| s.retry_count)
    }

    /// Ids for which a load may start now.
    #[must_use]
    pub fn loadable_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap()
            .edges
            .iter()
            .filter(|(_, s)| s.can_load())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// True if at least one edge is registered and every edge is exhausted.
    #[must_use]
    pub fn is_all_exhausted(&self) -> bool {
        let g = self.inner.lock().unwrap();
        !g.edges.is_empty()
            && g.edges
                .values()
                .all(|s| s.status == EdgeStatus::Exhausted)
    }

    /// True if any edge has a load in flight.
    #[must_use]
    pub fn is_any_loading(&self) -> bool {
        self.inner
            .lock()
            .unwrap()
            .edges
            .values()
            .any(|s| s.status == EdgeStatus::Loading)
    }

    // |-----------|
    // | Snapshots |
    // |-----------|

    /// Capture the offsets of every offset-token edge.
    ///
    /// Cursor tokens have no meaning outside the session that issued them
    /// and are skipped (documented loss); so are empty and end tokens.
    #[must_use]
    pub fn capture_state(&self) -> PaginationSnapshot {
        let offsets: BTreeMap<String, u64> = self
            .inner
            .lock()
            .unwrap()
            .edges
            .iter()
            .filter_map(|(id, s)| s.token.as_offset().map(|o| (id.clone(), o)))
            .collect();
        PaginationSnapshot { offsets }
    }

    /// Restore from a snapshot: every mentioned id is (re-)registered idle
    /// with an offset token; every other registered edge resets to
    /// idle/empty. Notifies once.
    pub fn restore_state(&self, snapshot: &PaginationSnapshot) {
        {
            let mut g = self.inner.lock().unwrap();
            for state in g.edges.values_mut() {
                *state = EdgeState::default();
            }
            for (id, offset) in &snapshot.offsets {
                let state = g.edges.entry(id.clone()).or_default();
                state.token = PageToken::offset(*offset);
            }
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

    /// Drop all listeners.
    pub fn dispose(&self) {
        self.emitter.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_token_helpers() {
        assert!(PageToken::Empty.has_more());
        assert!(!PageToken::End.has_more());
        assert!(PageToken::offset(3).has_more());
        assert!(PageToken::cursor("abc").has_more());

        assert_eq!(PageToken::offset(3).as_offset(), Some(3));
        assert_eq!(PageToken::offset_of(3, 9).as_offset(), Some(3));
        assert_eq!(PageToken::cursor("abc").as_offset(), None);
        assert_eq!(PageToken::End.as_offset(), None);
    }

    #[test]
    fn edge_state_can_load_table() {
        let mut state = EdgeState::default();
        assert_eq!(state.status, EdgeStatus::Idle);
        assert_eq!(state.token, PageToken::Empty);
        assert!(state.can_load());

        state.status = EdgeStatus::Loading;
        assert!(!state.can_load());

        state.status = EdgeStatus::Error;
        assert!(state.can_load());

        state.status = EdgeStatus::Exhausted;
        assert!(!state.can_load());

        state.status = EdgeStatus::Idle;
        state.token = PageToken::End;
        assert!(!state.can_load());
    }

    #[test]
    fn redundant_hints_do_not_notify() {
        let p = PaginationState::new();
        p.set_hint("feed", true);

        let counter = crate::testing::ChangeCounter::new();
        p.add_listener(counter.callback());

        p.set_hint("feed", true);
        assert_eq!(counter.count(), 0);
        p.set_hint("feed", false);
        assert_eq!(counter.count(), 1);
        p.clear_hint("nope");
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn reset_on_an_unknown_id_is_silent() {
        let p = PaginationState::new();
        let counter = crate::testing::ChangeCounter::new();
        p.add_listener(counter.callback());

        p.reset("ghost");
        p.reset_keeping_hint("ghost", false);
        assert_eq!(counter.count(), 0);
        assert!(!p.is_registered("ghost"));
    }

    #[test]
    fn remove_edge_keeps_the_hint() {
        let p = PaginationState::new();
        p.add_edge("feed");
        p.set_hint("feed", true);

        p.remove_edge("feed");
        assert!(!p.is_registered("feed"));
        assert!(p.has_hint("feed"));
    }
}
