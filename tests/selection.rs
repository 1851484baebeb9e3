use slotline::testing::ChangeCounter;
use slotline::{SelectionManager, Tristate};

#[test]
fn single_key_selection_round_trip() {
    let selection: SelectionManager<u32> = SelectionManager::new();
    assert!(!selection.is_selected(&1));

    selection.select(1, true);
    assert!(selection.is_selected(&1));
    assert_eq!(selection.count(), 1);

    selection.select(1, false);
    assert!(!selection.is_selected(&1));
    assert_eq!(selection.count(), 0);
}

#[test]
fn state_of_aggregates_to_tristate() {
    let selection: SelectionManager<u32> = SelectionManager::new();
    selection.select_all([1, 2]);

    assert_eq!(selection.state_of(&[1, 2]), Tristate::Yes);
    assert_eq!(selection.state_of(&[1, 3]), Tristate::Mixed);
    assert_eq!(selection.state_of(&[3, 4]), Tristate::No);
    assert_eq!(selection.state_of(&[]), Tristate::No, "empty set is No");
}

#[test]
fn scopes_are_independent() {
    let selection: SelectionManager<u32> = SelectionManager::new();
    selection.select(1, true);
    selection.select_in("col-b", 1, true);
    selection.select_in("col-b", 2, true);

    assert!(selection.is_selected(&1));
    assert!(selection.is_selected_in("col-b", &1));
    assert!(!selection.is_selected_in("col-b", &3));
    assert_eq!(selection.count(), 1);
    assert_eq!(selection.count_in("col-b"), 2);
    assert_eq!(selection.state_of_in("col-b", &[1, 2]), Tristate::Yes);
    assert_eq!(selection.state_of(&[1, 2]), Tristate::Mixed);

    selection.clear_scope("col-b");
    assert_eq!(selection.count_in("col-b"), 0);
    assert_eq!(selection.count(), 1, "other scopes untouched");

    selection.clear_all();
    assert_eq!(selection.count(), 0);
}

#[test]
fn selected_keys_keep_selection_order() {
    let selection: SelectionManager<u32> = SelectionManager::new();
    selection.select(5, true);
    selection.select(1, true);
    selection.select(3, true);
    assert_eq!(selection.selected_keys(), vec![5, 1, 3]);

    selection.deselect_all([1, 5].iter());
    assert_eq!(selection.selected_keys(), vec![3]);
}

#[test]
fn mutations_notify_once_and_noops_stay_silent() {
    let selection: SelectionManager<u32> = SelectionManager::new();
    let counter = ChangeCounter::new();
    selection.add_listener(counter.callback());

    selection.select(1, true);
    assert_eq!(counter.count(), 1);
    selection.select(1, true);
    assert_eq!(counter.count(), 1, "already selected");
    selection.select(2, false);
    assert_eq!(counter.count(), 1, "deselecting an unselected key");

    selection.select_all([3, 4, 5]);
    assert_eq!(counter.count(), 2, "bulk select notifies once");
    selection.select_all([3, 4]);
    assert_eq!(counter.count(), 2, "fully redundant bulk select is silent");

    selection.deselect_all([3, 4].iter());
    assert_eq!(counter.count(), 3, "bulk deselect notifies once");

    selection.clear_all();
    assert_eq!(counter.count(), 4);
    selection.clear_all();
    assert_eq!(counter.count(), 4, "clearing empty selection is silent");
}
