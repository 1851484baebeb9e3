//! Error types for the engine.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants map
//! one-to-one onto the structural invariants of the [`Node`](crate::Node)
//! tree and the pagination state machine; snapshot decoding is deliberately
//! infallible (malformed input yields an empty snapshot, see
//! [`snapshot`](crate::snapshot)).

/// The error type for engine operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// An item with the same key already exists in the target node.
    #[error("duplicate key {key} in node {node}")]
    DuplicateKey {
        /// Id of the node that rejected the item.
        node: String,
        /// Debug rendering of the offending key.
        key: String,
    },

    /// Attaching the child would make a node its own ancestor.
    #[error("attaching {would_be_child} to {node} would create a cycle")]
    CycleDetected {
        /// Id of the node that rejected the child.
        node: String,
        /// Id of the child that would have closed the cycle.
        would_be_child: String,
    },

    /// A required id or key was not present.
    #[error("{what} {id} not found")]
    NotFound {
        /// What kind of thing was looked up (`"child"`, `"item"`, ...).
        what: &'static str,
        /// Debug rendering of the missing id or key.
        id: String,
    },

    /// Internal invariant violation: a node appeared in two parents at once.
    ///
    /// This cannot be produced through the public API; it exists so internal
    /// consistency checks have something to report.
    #[error("node {node} is already attached to another parent")]
    AttachedElsewhere {
        /// Id of the doubly-attached node.
        node: String,
    },

    /// A completion carried a token shape that cannot follow a load
    /// (currently only [`PageToken::Empty`](crate::PageToken::Empty)).
    /// Returned by
    /// [`try_complete`](crate::PaginationState::try_complete); the lenient
    /// [`complete`](crate::PaginationState::complete) downgrades it to a
    /// diagnostic.
    #[error("invalid completion token for edge {edge}")]
    InvalidToken {
        /// The edge id the completion was addressed to.
        edge: String,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
