//! Bi-directional feed loading driven by the pagination state machine.
//!
//! The engine does no I/O; this demo plays the role of the network layer,
//! calling `start_loading` / `complete` / `fail` around a fake fetch.
//!
//! Run with `cargo run --example feed_pagination`.

use slotline::{
    CollectionController, EDGE_LEADING, EDGE_TRAILING, PageToken, PaginationState, SlotManager,
};

#[derive(Clone, Debug)]
struct Post {
    id: u64,
    text: String,
}

/// Fake backend: 25 posts served in pages of 10.
fn fetch(offset: u64, limit: u64) -> (Vec<Post>, Option<PageToken>) {
    const TOTAL: u64 = 25;
    let end = (offset + limit).min(TOTAL);
    let posts = (offset..end)
        .map(|id| Post {
            id,
            text: format!("post #{id}"),
        })
        .collect();
    let next = if end >= TOTAL {
        Some(PageToken::End)
    } else {
        Some(PageToken::offset_of(end, TOTAL))
    };
    (posts, next)
}

fn main() {
    let controller = CollectionController::new(|p: &Post| p.id);
    let slots = SlotManager::new(&controller);

    let pagination = PaginationState::new();
    pagination.set_diagnostic_hook(|msg| eprintln!("pagination: {msg}"));
    pagination.add_edge(EDGE_TRAILING);
    pagination.add_edge(EDGE_LEADING);
    pagination.set_hint(EDGE_TRAILING, true);

    // The leading edge has nothing above the first page.
    assert!(pagination.start_loading(EDGE_LEADING));
    pagination.complete(EDGE_LEADING, Some(PageToken::End));

    let mut failed_once = false;
    while pagination.can_load(EDGE_TRAILING) {
        if !pagination.start_loading(EDGE_TRAILING) {
            break;
        }
        let offset = pagination
            .get_token(EDGE_TRAILING)
            .and_then(|t| t.as_offset())
            .unwrap_or(0);

        // Simulate one transient network failure on the second page.
        if offset == 10 && !failed_once {
            failed_once = true;
            pagination.fail(EDGE_TRAILING, "connection reset");
            println!(
                "page at offset {offset} failed (retry #{}), retrying...",
                pagination.retry_count(EDGE_TRAILING)
            );
            continue;
        }

        let (posts, next) = fetch(offset, 10);
        println!("loaded {} posts at offset {offset}", posts.len());
        controller.add_all(posts).expect("post ids are unique");
        pagination.complete(EDGE_TRAILING, next);
    }

    println!(
        "done: {} posts, {} slots, trailing exhausted: {}, all exhausted: {}",
        controller.source_len(),
        slots.total_slots(),
        pagination.is_exhausted(EDGE_TRAILING),
        pagination.is_all_exhausted(),
    );

    let snapshot = pagination.capture_state();
    println!("resume state: {}", snapshot.to_json());
}
