//! Testing utilities for projection engines.
//!
//! This module provides the tooling the crate's own integration tests are
//! written with, and that downstream users can reuse for theirs:
//!
//! - **Assertions**: compare slot sequences and collections with readable
//!   failure output
//! - **Builders**: generate test data fluently
//! - **Fixtures**: a ready-made task item type, datasets, and a fully wired
//!   engine
//! - **Debug utilities**: eprintln inspectors for slots, trees, and edges
//! - [`ChangeCounter`]: count notifications to pin down "notifies exactly
//!   once" behaviour
//!
//! # Quick Start
//!
//! ```
//! use slotline::testing::*;
//!
//! let engine = task_engine(sample_tasks());
//! engine.slots.collapse_all();
//! assert!(engine.slots.total_slots() > 0);
//! ```

pub mod assertions;
pub mod builders;
pub mod debug;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use debug::*;
pub use fixtures::*;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts notifications from any emitter-bearing component.
///
/// Pass [`callback`](Self::callback) to an `add_listener` and read
/// [`count`](Self::count) afterwards.
///
/// # Example
/// ```
/// use slotline::SelectionManager;
/// use slotline::testing::ChangeCounter;
///
/// let selection: SelectionManager<u32> = SelectionManager::new();
/// let counter = ChangeCounter::new();
/// selection.add_listener(counter.callback());
///
/// selection.select(1, true);
/// selection.select(1, true); // no-op: already selected
/// assert_eq!(counter.count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct ChangeCounter {
    count: Arc<AtomicUsize>,
}

impl ChangeCounter {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A listener closure that increments this counter.
    #[must_use]
    pub fn callback(&self) -> impl Fn() + Send + Sync + 'static {
        let count = Arc::clone(&self.count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Notifications seen so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Reset to zero.
    pub fn reset(&self) {
        self.count.store(0, Ordering::SeqCst);
    }
}
