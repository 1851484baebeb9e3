//! # Slotline
//!
//! An **in-memory collection projection engine** for Rust. Slotline takes a
//! bag of user items plus filter predicates, a sort order, and an ordered
//! list of grouping criteria, and maintains a displayable, navigable,
//! hierarchical projection: a tree of group nodes that flattens into an
//! index-addressable sequence of *slots* (group headers and items) suitable
//! for virtualised list UIs.
//!
//! ## Key Features
//!
//! - **Composable filtering** - per-filter OR over active values, AND across
//!   filters, plus `And`/`Or`/`Not`/`Ref` expression trees
//! - **Stable multi-level sorting** - lexicographic option chains, nulls
//!   last, input order as the final tie-break
//! - **Folder-like and tag-like grouping** - `None` keys keep an item at the
//!   parent level; multi-valued keys enumerate it into every matching group
//! - **Slot flattening** - pre-order header+item sequence honouring
//!   per-group collapse state that survives rebuilds
//! - **Tri-state selection** - scoped key sets aggregating to
//!   yes / no / mixed
//! - **Pagination state machine** - per-edge load cursors with hints,
//!   retries, and at-most-one in-flight load per edge
//! - **Snapshots** - JSON and URL-query round-trips for filter / sort /
//!   group / pagination state
//! - **Change notification** - every component is observable; listeners
//!   query state after each synchronous mutation
//!
//! ## Quick Start
//!
//! ```
//! use slotline::*;
//!
//! #[derive(Clone)]
//! struct Track { id: u32, artist: String, rating: Option<u8> }
//!
//! // Managers are built separately and attached to the controller.
//! let sorts = SortManager::new();
//! sorts.add(ValueSortOption::new("rating", |t: &Track| t.rating));
//!
//! let groups = GroupManager::new();
//! groups.add(GroupOption::single("artist", |t: &Track| Some(t.artist.clone())));
//!
//! let controller = CollectionController::new(|t: &Track| t.id)
//!     .with_sorts(sorts)
//!     .with_groups(groups);
//!
//! controller.add_all(vec![
//!     Track { id: 1, artist: "mono".into(), rating: Some(5) },
//!     Track { id: 2, artist: "mono".into(), rating: Some(3) },
//!     Track { id: 3, artist: "eluvium".into(), rating: None },
//! ]).unwrap();
//!
//! // Flatten the projection into renderable slots.
//! let slots = SlotManager::new(&controller);
//! assert_eq!(slots.total_slots(), 5); // 2 headers + 3 items
//! assert!(slots.is_header(0));
//!
//! // Collapse a group; only its header remains visible.
//! slots.collapse("artist=mono");
//! assert_eq!(slots.total_slots(), 3); // two mono tracks hidden
//! ```
//!
//! ## Core Concepts
//!
//! ### `CollectionController`
//!
//! The [`CollectionController`] owns the source items (keyed by a
//! user-supplied `key_of` callback) and rebuilds the projection whenever the
//! source or any attached manager changes: filter → stable sort → group
//! walk → atomic root swap → one notification. See
//! [`controller`](mod@controller) for the exact pipeline.
//!
//! ### `Node`
//!
//! The projection is a tree of [`Node`]s: insertion-ordered keyed items,
//! insertion-ordered children, weak parent links, and a collapse tristate.
//! Nodes are cheap handles; the controller replaces the whole tree on every
//! rebuild rather than patching it.
//!
//! ### `SlotManager`
//!
//! The [`SlotManager`] flattens the projected tree into a linear sequence of
//! [`Slot`]s — group headers first, then direct items, recursively —
//! honouring per-group collapse state keyed by stable path ids
//! (`cat=A/prio=1`). Indices are only valid until the next change event.
//!
//! ### Managers
//!
//! [`FilterManager`], [`SortManager`], and [`GroupManager`] are independent,
//! observable registries. They can be shared between controllers, mutated
//! through their own handles, and captured/restored as snapshots.
//! [`SelectionManager`] tracks scoped tri-state selection over item keys and
//! is orthogonal to the projection.
//!
//! ### `PaginationState`
//!
//! The engine performs no I/O. [`PaginationState`] tracks per-edge load
//! state (`idle → loading → idle/exhausted/error`) so callers can wrap
//! their own fetches; reserved edge ids ([`EDGE_LEADING`], [`EDGE_TRAILING`],
//! ...) cover the common directions.
//!
//! ## Snapshots
//!
//! Every manager captures to a serde-backed snapshot with four surfaces:
//! `to_json` / `from_json` and `to_query_string` / `from_query_string`.
//! Decoding never fails — malformed input yields an empty snapshot. The
//! [`snapshot::ViewState`] bundle captures all four managers at once:
//!
//! ```
//! use slotline::testing::{task_engine, sample_tasks};
//! use slotline::snapshot::ViewState;
//!
//! let engine = task_engine(sample_tasks());
//! engine.category_filter.add_value("ops".to_string());
//!
//! let view = ViewState {
//!     filters: engine.filters.capture_state(),
//!     sorts: engine.sorts.capture_state(),
//!     groups: engine.groups.capture_state(),
//!     pagination: engine.pagination.capture_state(),
//! };
//! let query = view.to_query_string();
//! assert!(query.contains("filter.cat=ops"));
//! assert_eq!(ViewState::from_json(&view.to_json()), view);
//! assert_eq!(ViewState::from_query_string(&query).to_query_string(), query);
//! ```
//!
//! ## Grouping Semantics
//!
//! Each enabled [`GroupOption`] contributes one level of the projected tree
//! and may yield zero, one, or many keys per item:
//!
//! - **one key** — the item descends into that group;
//! - **zero keys** (folder-like) — the walk stops and the item stays at the
//!   level it reached, like a file sitting next to sub-folders;
//! - **many keys** (tag-like) — the item is enumerated into every matching
//!   sibling group; its key stays the same across appearances, so selection
//!   is naturally shared.
//!
//! ```
//! use slotline::*;
//!
//! #[derive(Clone)]
//! struct Note { id: u32, folder: Option<String>, tags: Vec<String> }
//!
//! let groups = GroupManager::new();
//! groups.add(GroupOption::single("folder", |n: &Note| n.folder.clone()).with_order(0));
//! groups.add(GroupOption::multi("tag", |n: &Note| n.tags.clone()).with_order(1));
//!
//! let controller = CollectionController::new(|n: &Note| n.id).with_groups(groups);
//! controller.add_all(vec![
//!     // Lands in folder "inbox", then under both tag groups.
//!     Note { id: 1, folder: Some("inbox".into()), tags: vec!["a".into(), "b".into()] },
//!     // No folder: the walk truncates and the note stays at the root —
//!     // later levels are not consulted for it.
//!     Note { id: 2, folder: None, tags: vec!["a".into()] },
//!     Note { id: 3, folder: None, tags: vec![] },
//! ]).unwrap();
//!
//! let root = controller.root();
//! let inbox = root.child("folder=inbox").unwrap();
//! assert_eq!(inbox.child("tag=a").unwrap().keys(), vec![1]);
//! assert_eq!(inbox.child("tag=b").unwrap().keys(), vec![1]);
//! assert_eq!(root.keys(), vec![2, 3]);
//! // Note 1 appears twice (once per tag); 2 and 3 once each.
//! assert_eq!(controller.len(), 4);
//! ```
//!
//! ## Driving Pagination
//!
//! [`PaginationState`] never fetches anything. The caller brackets its own
//! I/O with the state machine, which enforces at-most-one in-flight load per
//! edge and remembers the resume token:
//!
//! ```
//! use slotline::{PageToken, PaginationState, EDGE_TRAILING};
//!
//! let pagination = PaginationState::new();
//! pagination.set_hint(EDGE_TRAILING, true); // "there may be more" before any load
//!
//! while pagination.can_load(EDGE_TRAILING) || !pagination.is_registered(EDGE_TRAILING) {
//!     if !pagination.start_loading(EDGE_TRAILING) {
//!         break;
//!     }
//!     let offset = pagination
//!         .get_token(EDGE_TRAILING)
//!         .and_then(|t| t.as_offset())
//!         .unwrap_or(0);
//!     // ... fetch rows at `offset` here; on failure call
//!     // `pagination.fail(EDGE_TRAILING, err)` and retry later ...
//!     let next = if offset >= 20 { PageToken::End } else { PageToken::offset(offset + 10) };
//!     pagination.complete(EDGE_TRAILING, Some(next));
//! }
//!
//! assert!(pagination.is_exhausted(EDGE_TRAILING));
//! assert!(!pagination.has_hint(EDGE_TRAILING)); // exhaustion clears the hint
//! ```
//!
//! ## Threading Model
//!
//! The engine is **single-threaded cooperative**: no internal tasks, no
//! suspension points, every rebuild and flatten synchronous. Handles are
//! `Arc`-based and `Send + Sync` so they can live in whatever thread the UI
//! runs on, but mutations are expected from one logical thread; listeners
//! run synchronously in registration order and may themselves mutate the
//! engine (listener lists are snapshotted before iterating).
//!
//! ## Testing Your Projections
//!
//! The [`testing`] module ships the assertions, builders, fixtures, and
//! debug inspectors the crate's own tests use:
//!
//! ```
//! use slotline::testing::*;
//!
//! let engine = task_engine(sample_tasks());
//! engine.category_filter.add_value("dev".to_string());
//! assert_all(&engine.controller.items(), |t| t.id >= 1);
//! dump_slots("after filter", &engine.slots);
//! ```
//!
//! ## Module Overview
//!
//! - [`emitter`] - the observer primitive everything notifies through
//! - [`node`] - the hierarchical item container
//! - [`filter`] / [`sort`] / [`group`] / [`selection`] - the managers
//! - [`pagination`] - the per-edge load state machine
//! - [`controller`](mod@controller) - source ownership and the rebuild pipeline
//! - [`slots`] - flattening and collapse
//! - [`snapshot`] - snapshot types and codecs
//! - [`error`] - the error enum
//! - [`testing`] - test utilities

pub mod controller;
pub mod emitter;
pub mod error;
pub mod filter;
pub mod group;
pub mod node;
pub mod pagination;
pub mod selection;
pub mod slots;
pub mod snapshot;
pub mod sort;
pub mod testing;
pub mod tristate;
pub mod utils;

// General re-exports
pub use controller::{CollectionController, ROOT_ID};
pub use emitter::{ChangeEmitter, ListenerHandle};
pub use error::{Error, Result};
pub use filter::{
    DynFilter, Filter, FilterExpr, FilterManager, FilterValue, ValueCodec, regex_filter,
    text_filter,
};
pub use group::{GroupManager, GroupOption};
pub use node::{GroupTag, ItemBound, KeyBound, KeyOf, Node, Traversal};
pub use pagination::{
    EDGE_BOTTOM, EDGE_LEADING, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP, EDGE_TRAILING, EdgeState,
    EdgeStatus, PageToken, PaginationState, RESERVED_EDGE_IDS,
};
pub use selection::{DEFAULT_SCOPE, SelectionManager};
pub use slots::{GroupHeader, ItemSlot, Slot, SlotManager};
pub use snapshot::{
    FilterCriteria, FilterSnapshot, GroupSnapshot, PaginationSnapshot, SortCriteria, SortSnapshot,
    ViewState,
};
pub use sort::{
    ComparatorSortOption, DynSort, SortDirection, SortManager, ValueSortOption, float_sort_option,
};
pub use tristate::Tristate;
