//! Debug inspectors that print engine state to stderr during tests.

use crate::node::{ItemBound, KeyBound, Node};
use crate::pagination::PaginationState;
use crate::slots::{Slot, SlotManager};

/// Print the visible slot sequence, one indented line per slot.
pub fn dump_slots<T: ItemBound, K: KeyBound>(label: &str, slots: &SlotManager<T, K>) {
    let all = slots.slots();
    eprintln!(
        "[{label}] {} slots, {} unique items",
        all.len(),
        slots.unique_item_count()
    );
    for (i, slot) in all.iter().enumerate() {
        match slot {
            Slot::Header(h) => eprintln!(
                "[{label}] {i:>4} {}[{}] ({} direct, {} total)",
                "  ".repeat(h.depth),
                h.label,
                h.item_count,
                h.total_count
            ),
            Slot::Item(item) => {
                eprintln!("[{label}] {i:>4} {}{:?}", "  ".repeat(item.depth), item.key);
            }
        }
    }
}

/// Print a node tree, one indented line per node.
pub fn dump_tree<T: ItemBound, K: KeyBound>(label: &str, node: &Node<T, K>) {
    fn walk<T: ItemBound, K: KeyBound>(label: &str, node: &Node<T, K>, depth: usize) {
        eprintln!(
            "[{label}] {}{} ({} items, {:?})",
            "  ".repeat(depth),
            node.id(),
            node.len(),
            node.collapse_state()
        );
        for child in node.children() {
            walk(label, &child, depth + 1);
        }
    }
    walk(label, node, 0);
}

/// Print every registered pagination edge with its status and token.
pub fn dump_edges(label: &str, pagination: &PaginationState) {
    let ids = pagination.edge_ids();
    eprintln!("[{label}] {} edges", ids.len());
    for id in ids {
        if let Some(state) = pagination.get_state(&id) {
            eprintln!(
                "[{label}]   {id}: {:?} token={:?} retries={} hint={:?}",
                state.status,
                state.token,
                state.retry_count,
                pagination.get_hint(&id)
            );
        }
    }
}
