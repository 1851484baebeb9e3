use slotline::{Error, Node, Traversal, Tristate};

type Row = (u32, &'static str);

fn node(id: &str) -> Node<Row, u32> {
    Node::with_key_fn(id, |row: &Row| row.0)
}

#[test]
fn add_preserves_insertion_order_and_rejects_duplicates() {
    let n = node("root");
    n.add_all([(1, "a"), (2, "b"), (3, "c")]).unwrap();

    assert_eq!(n.len(), 3);
    assert_eq!(n.keys(), vec![1, 2, 3]);
    assert_eq!(n.at(1), Some((2, "b")));

    let err = n.add((2, "again")).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { .. }));
    assert_eq!(n.len(), 3, "failed add must not change the node");
}

#[test]
fn insert_shifts_later_items_and_clamps_the_index() {
    let n = node("root");
    n.add_all([(1, "a"), (3, "c")]).unwrap();

    n.insert(1, (2, "b")).unwrap();
    assert_eq!(n.keys(), vec![1, 2, 3]);

    n.insert(99, (4, "d")).unwrap();
    assert_eq!(n.keys(), vec![1, 2, 3, 4]);
}

#[test]
fn replace_by_key_keeps_position() {
    let n = node("root");
    n.add_all([(1, "a"), (2, "b"), (3, "c")]).unwrap();

    let old = n.replace_by_key(&2, (2, "B")).unwrap();
    assert_eq!(old, (2, "b"));
    assert_eq!(n.at(1), Some((2, "B")));

    // Replacement may re-key the slot; the position is retained.
    let old = n.replace_by_key(&2, (5, "E")).unwrap();
    assert_eq!(old, (2, "B"));
    assert_eq!(n.keys(), vec![1, 5, 3]);
    assert_eq!(n.index_of_key(&5), Some(1));

    let err = n.replace_by_key(&5, (3, "collide")).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { .. }));

    let err = n.replace_by_key(&42, (6, "f")).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn removal_keeps_the_order_of_the_rest() {
    let n = node("root");
    n.add_all([(1, "a"), (2, "b"), (3, "c")]).unwrap();

    assert_eq!(n.remove_by_key(&2), Some((2, "b")));
    assert_eq!(n.remove_by_key(&2), None);
    assert_eq!(n.keys(), vec![1, 3]);

    assert_eq!(n.remove(&(1, "a")), Some((1, "a")));
    assert_eq!(n.keys(), vec![3]);

    n.clear();
    assert_eq!(n.len(), 0);
}

#[test]
fn lookups_work_by_key_index_and_item() {
    let n = node("root");
    n.add_all([(10, "x"), (20, "y")]).unwrap();

    assert_eq!(n.get(&20), Some((20, "y")));
    assert_eq!(n.get(&30), None);
    assert_eq!(n.index_of_key(&10), Some(0));
    assert_eq!(n.index_of(&(20, "y")), Some(1));
    assert!(n.contains_key(&10));
    assert!(!n.contains_key(&99));
    assert_eq!(n.at(5), None);
}

#[test]
fn sort_is_stable_over_items_only() {
    let n = node("root");
    n.add_all([(1, "b"), (2, "a"), (3, "b"), (4, "a")]).unwrap();

    n.sort(|a, b| a.1.cmp(b.1));
    // Equal elements keep their relative order.
    assert_eq!(n.keys(), vec![2, 4, 1, 3]);
}

#[test]
fn add_child_moves_an_attached_child() {
    let a = node("a");
    let b = node("b");
    let child = node("child");

    a.add_child(&child).unwrap();
    assert_eq!(a.child_count(), 1);
    assert!(child.parent().unwrap().same_node(&a));

    b.add_child(&child).unwrap();
    assert_eq!(a.child_count(), 0, "child must be detached from the old parent");
    assert!(child.parent().unwrap().same_node(&b));
}

#[test]
fn add_child_rejects_cycles_and_duplicate_ids() {
    let root = node("root");
    let mid = node("mid");
    let leaf = node("leaf");
    root.add_child(&mid).unwrap();
    mid.add_child(&leaf).unwrap();

    let err = leaf.add_child(&root).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));
    let err = root.add_child(&root).unwrap_err();
    assert!(matches!(err, Error::CycleDetected { .. }));

    let impostor = node("mid");
    let err = root.add_child(&impostor).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey { .. }));

    // Re-adding the same child is a no-op.
    root.add_child(&mid).unwrap();
    assert_eq!(root.child_count(), 1);
}

#[test]
fn remove_child_detaches_and_reports_missing_ids() {
    let root = node("root");
    let child = node("child");
    root.add_child(&child).unwrap();

    let removed = root.remove_child("child").unwrap();
    assert!(removed.same_node(&child));
    assert!(child.parent().is_none());

    let err = root.remove_child("child").unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn ancestry_depth_height_and_root() {
    let root = node("root");
    let mid = node("mid");
    let leaf = node("leaf");
    root.add_child(&mid).unwrap();
    mid.add_child(&leaf).unwrap();

    assert!(root.is_ancestor_of(&leaf));
    assert!(root.is_ancestor_of(&root));
    assert!(!leaf.is_ancestor_of(&root));

    assert_eq!(root.depth(), 0);
    assert_eq!(leaf.depth(), 2);
    assert_eq!(root.height(), 2);
    assert_eq!(leaf.height(), 0);

    assert!(leaf.root().same_node(&root));
    assert!(leaf.move_to(&root).is_ok());
    assert_eq!(leaf.depth(), 1);
    assert_eq!(mid.child_count(), 0);
}

fn sample_tree() -> Node<Row, u32> {
    let root = node("root");
    let a = node("a");
    let b = node("b");
    let a1 = node("a1");
    let a2 = node("a2");
    let b1 = node("b1");
    root.add_child(&a).unwrap();
    root.add_child(&b).unwrap();
    a.add_child(&a1).unwrap();
    a.add_child(&a2).unwrap();
    b.add_child(&b1).unwrap();

    root.add_all([(1, "r")]).unwrap();
    a.add_all([(2, "a"), (3, "a")]).unwrap();
    a1.add((4, "a1")).unwrap();
    b1.add((5, "b1")).unwrap();
    root
}

#[test]
fn descendants_orderings() {
    let root = sample_tree();

    let bfs: Vec<String> = root
        .descendants(Traversal::BreadthFirst)
        .iter()
        .map(Node::id)
        .collect();
    assert_eq!(bfs, vec!["a", "b", "a1", "a2", "b1"]);

    let dfs: Vec<String> = root
        .descendants(Traversal::DepthFirst)
        .iter()
        .map(Node::id)
        .collect();
    assert_eq!(dfs, vec!["a", "a1", "a2", "b", "b1"]);
}

#[test]
fn find_node_searches_depth_first_including_self() {
    let root = sample_tree();
    assert!(root.find_node("root").unwrap().same_node(&root));
    assert_eq!(root.find_node("b1").unwrap().id(), "b1");
    assert!(root.find_node("nope").is_none());
}

#[test]
fn flattened_items_yield_self_then_children_in_order() {
    let root = sample_tree();
    let keys: Vec<u32> = root.flattened_items().iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![1, 2, 3, 4, 5]);
    assert_eq!(root.flattened_len(), 5);
}

#[test]
fn visible_descendants_skip_collapsed_subtrees() {
    let root = sample_tree();
    root.child("a").unwrap().set_collapsed(Tristate::Yes);

    let visible: Vec<String> = root.visible_descendants().iter().map(Node::id).collect();
    // "a" itself is yielded; its subtree is not.
    assert_eq!(visible, vec!["a", "b", "b1"]);
}

#[test]
fn collapse_state_machine() {
    let root = sample_tree();
    let a = root.child("a").unwrap();

    assert_eq!(a.collapse_state(), Tristate::No);
    a.toggle();
    assert_eq!(a.collapse_state(), Tristate::Yes);
    a.toggle();
    assert_eq!(a.collapse_state(), Tristate::No);

    root.collapse_all();
    assert!(root.descendants(Traversal::BreadthFirst)
        .iter()
        .all(|n| n.collapse_state() == Tristate::Yes));

    root.expand_all();
    assert!(root.descendants(Traversal::BreadthFirst)
        .iter()
        .all(|n| n.collapse_state() == Tristate::No));

    // Depth >= 1 collapses; the root stays expanded.
    root.collapse_to_level(1);
    assert_eq!(root.collapse_state(), Tristate::No);
    assert_eq!(root.child("a").unwrap().collapse_state(), Tristate::Yes);
    assert_eq!(
        root.child("a").unwrap().child("a1").unwrap().collapse_state(),
        Tristate::Yes
    );
}

#[test]
fn deep_clone_is_isomorphic_and_detached() {
    let root = sample_tree();
    root.child("a").unwrap().set_collapsed(Tristate::Yes);

    let copy = root.deep_clone();
    assert!(!copy.same_node(&root));
    assert!(copy.parent().is_none());
    assert_eq!(copy.flattened_len(), root.flattened_len());
    assert_eq!(copy.child("a").unwrap().collapse_state(), Tristate::Yes);

    // Mutating the copy leaves the original alone.
    copy.child("a").unwrap().clear();
    assert_eq!(root.child("a").unwrap().len(), 2);
    assert_eq!(copy.child("a").unwrap().len(), 0);

    let ids: Vec<String> = copy
        .descendants(Traversal::DepthFirst)
        .iter()
        .map(Node::id)
        .collect();
    assert_eq!(ids, vec!["a", "a1", "a2", "b", "b1"]);
}
