use slotline::testing::{
    ChangeCounter, assert_header, assert_item_slot, assert_slot_labels, sample_tasks, task,
    task_engine,
};
use slotline::{Slot, Tristate};

// task_engine groups by category then priority and sorts by priority then
// title, so sample_tasks() flattens to a fixed, documented sequence:
//
//   [dev] [1] 3 [2] 5 [3] 4 [ops] [1] 6 1 [2] 2
fn labels_of_sample() -> Vec<&'static str> {
    vec![
        "[dev]", "[1]", "3", "[2]", "5", "[3]", "4", "[ops]", "[1]", "6", "1", "[2]", "2",
    ]
}

#[test]
fn flattening_emits_headers_then_items_in_preorder() {
    let engine = task_engine(sample_tasks());
    assert_slot_labels(&engine.slots, &labels_of_sample());

    assert_eq!(engine.slots.total_slots(), 13);
    assert_eq!(engine.slots.unique_item_count(), 6);
    assert!(!engine.slots.is_empty());

    assert_header(&engine.slots, 0, "dev", 0, 0, 3);
    assert_header(&engine.slots, 1, "1", 1, 1, 1);
    assert_item_slot(&engine.slots, 2, &3, 2);
    assert_header(&engine.slots, 7, "ops", 0, 0, 3);
    assert_header(&engine.slots, 8, "1", 1, 2, 2);
    assert_item_slot(&engine.slots, 10, &1, 2);

    assert!(engine.slots.is_header(0));
    assert!(!engine.slots.is_header(2));
    assert!(!engine.slots.is_header(99));
    assert!(engine.slots.get_slot(99).is_none());
    assert_eq!(engine.slots.header_at(0).unwrap().path, "cat=dev");
    assert!(engine.slots.header_at(2).is_none());
}

#[test]
fn empty_projection_has_no_slots() {
    let engine = task_engine(vec![]);
    assert!(engine.slots.is_empty());
    assert_eq!(engine.slots.total_slots(), 0);
    assert_eq!(engine.slots.unique_item_count(), 0);
}

#[test]
fn collapsing_a_group_hides_its_subtree_but_keeps_counts() {
    let engine = task_engine(sample_tasks());

    engine.slots.collapse("cat=ops");
    assert_slot_labels(
        &engine.slots,
        &["[dev]", "[1]", "3", "[2]", "5", "[3]", "4", "[ops]"],
    );
    assert_header(&engine.slots, 7, "ops", 0, 0, 3);
    assert_eq!(
        engine.slots.unique_item_count(),
        6,
        "hidden items still count as unique"
    );

    engine.slots.expand("cat=ops");
    assert_eq!(engine.slots.total_slots(), 13);
}

#[test]
fn toggle_and_collapse_states() {
    let engine = task_engine(sample_tasks());

    assert_eq!(engine.slots.collapse_state("cat=ops"), Tristate::No);
    engine.slots.toggle_collapse("cat=ops/prio=1");
    assert!(engine.slots.is_collapsed("cat=ops/prio=1"));
    assert_eq!(engine.slots.collapse_state("cat=ops/prio=1"), Tristate::Yes);
    assert_eq!(
        engine.slots.collapse_state("cat=ops"),
        Tristate::Mixed,
        "expanded group with a collapsed descendant is mixed"
    );

    engine.slots.toggle_collapse("cat=ops/prio=1");
    assert_eq!(engine.slots.collapse_state("cat=ops"), Tristate::No);
}

#[test]
fn collapse_all_and_expand_all_are_inverses() {
    let engine = task_engine(sample_tasks());
    let baseline = engine.slots.total_slots();

    engine.slots.collapse_all();
    assert_slot_labels(&engine.slots, &["[dev]", "[ops]"]);

    engine.slots.expand_all();
    assert_eq!(engine.slots.total_slots(), baseline);

    // The reverse order holds too.
    engine.slots.expand_all();
    assert_eq!(engine.slots.total_slots(), baseline);
}

#[test]
fn collapse_to_level_collapses_deep_groups_and_expands_shallow_ones() {
    let engine = task_engine(sample_tasks());
    engine.slots.collapse("cat=dev");

    engine.slots.collapse_to_level(1);
    assert_slot_labels(
        &engine.slots,
        &["[dev]", "[1]", "[2]", "[3]", "[ops]", "[1]", "[2]"],
    );

    engine.slots.collapse_to_level(0);
    assert_slot_labels(&engine.slots, &["[dev]", "[ops]"]);

    engine.slots.collapse_to_level(9);
    assert_eq!(engine.slots.total_slots(), 13);
}

#[test]
fn collapse_where_adds_to_the_collapsed_set() {
    let engine = task_engine(sample_tasks());
    engine.slots.collapse("cat=dev");

    engine.slots.collapse_where(|h| h.option_id == "prio" && h.label == "1");
    assert!(engine.slots.is_collapsed("cat=ops/prio=1"));
    assert!(engine.slots.is_collapsed("cat=dev/prio=1"));
    assert!(
        engine.slots.is_collapsed("cat=dev"),
        "previously collapsed groups stay collapsed"
    );
}

#[test]
fn collapse_state_survives_rebuilds() {
    let engine = task_engine(sample_tasks());
    engine.slots.collapse("cat=ops");

    // A new ops task re-sorts the tree; ops stays collapsed.
    engine
        .controller
        .add(task(7, "aaa first by title", "ops", 1))
        .unwrap();

    assert_slot_labels(
        &engine.slots,
        &["[ops]", "[dev]", "[1]", "3", "[2]", "5", "[3]", "4"],
    );
    assert_header(&engine.slots, 0, "ops", 0, 0, 4);
    assert_eq!(engine.slots.unique_item_count(), 7);
}

#[test]
fn slot_changes_notify_consumers() {
    let engine = task_engine(sample_tasks());
    let counter = ChangeCounter::new();
    engine.slots.add_listener(counter.callback());

    engine.slots.collapse("cat=ops");
    assert_eq!(counter.count(), 1);
    engine.slots.collapse("cat=ops");
    assert_eq!(counter.count(), 1, "collapsing a collapsed group is silent");

    engine.controller.add(task(9, "new", "dev", 1)).unwrap();
    assert_eq!(counter.count(), 2, "rebuilds propagate to the slot view");

    engine.category_filter.add_value("dev".to_string());
    assert_eq!(counter.count(), 3, "manager changes propagate too");
}

#[test]
fn selection_aggregates_per_group() {
    let engine = task_engine(sample_tasks());

    assert_eq!(engine.slots.selection_state("cat=dev"), Tristate::No);

    engine.selection.select(3, true);
    assert_eq!(engine.slots.selection_state("cat=dev"), Tristate::Mixed);
    assert_eq!(engine.slots.selection_state("cat=dev/prio=1"), Tristate::Yes);
    assert_eq!(engine.slots.selection_state("cat=ops"), Tristate::No);

    engine.slots.select_group("cat=dev", true);
    assert_eq!(engine.slots.selection_state("cat=dev"), Tristate::Yes);
    assert_eq!(engine.selection.count(), 3);

    engine.slots.select_group("cat=dev", false);
    assert_eq!(engine.slots.selection_state("cat=dev"), Tristate::No);
    assert_eq!(engine.selection.count(), 0);

    assert_eq!(
        engine.slots.selection_state("cat=nowhere"),
        Tristate::No,
        "unknown paths aggregate to No"
    );
}

#[test]
fn dispose_stops_tracking_the_controller() {
    let engine = task_engine(sample_tasks());
    let counter = ChangeCounter::new();
    engine.slots.add_listener(counter.callback());

    engine.slots.dispose();
    engine.controller.add(task(9, "new", "dev", 1)).unwrap();
    assert_eq!(counter.count(), 0);
}

#[test]
fn slots_expose_item_payloads() {
    let engine = task_engine(vec![task(1, "solo", "ops", 2)]);
    let slots = engine.slots.slots();
    assert_eq!(slots.len(), 3);

    match &slots[2] {
        Slot::Item(item) => {
            assert_eq!(item.key, 1);
            assert_eq!(item.item.title, "solo");
            assert_eq!(item.depth, 2);
        }
        Slot::Header(_) => panic!("expected an item slot"),
    }
}
