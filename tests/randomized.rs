//! Randomized invariant checks: build many engine configurations over
//! deterministic pseudo-random data and verify the structural guarantees
//! hold in every one of them.

use slotline::testing::pseudo_random_data;
use slotline::{
    CollectionController, Filter, FilterManager, GroupManager, GroupOption, Slot, SlotManager,
    SortManager, ValueSortOption,
};
use std::collections::HashSet;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Record {
    id: u32,
    bucket: u8,
    weight: i32,
    labels: Vec<String>,
}

/// Deterministic dataset: `count` records spread over `buckets` buckets with
/// 0..=2 labels each.
fn records(count: usize, buckets: u8) -> Vec<Record> {
    let bucket_picks = pseudo_random_data(count, 0, i32::from(buckets));
    let weights = pseudo_random_data(count, -50, 50);
    let label_picks = pseudo_random_data(count * 2, 0, 4);

    (0..count)
        .map(|i| {
            let mut labels = Vec::new();
            for slot in 0..2 {
                // 0 means "no label in this slot"; duplicates collapse later.
                let pick = label_picks[i * 2 + slot];
                if pick != 0 {
                    labels.push(format!("l{pick}"));
                }
            }
            labels.dedup();
            Record {
                id: i as u32,
                bucket: bucket_picks[i] as u8,
                weight: weights[i],
                labels,
            }
        })
        .collect()
}

struct Build {
    controller: CollectionController<Record, u32>,
    slots: SlotManager<Record, u32>,
    bucket_filter: Filter<Record, u8>,
}

fn build(data: Vec<Record>, group_by_bucket: bool, group_by_label: bool) -> Build {
    let bucket_filter: Filter<Record, u8> =
        Filter::stringly("bucket", |r: &Record, v: &u8| r.bucket == *v);
    let filters = FilterManager::new();
    filters.add(bucket_filter.clone());

    let sorts = SortManager::new();
    sorts.add(ValueSortOption::new("weight", |r: &Record| Some(r.weight)));

    let groups = GroupManager::new();
    groups.add(
        GroupOption::single("bucket", |r: &Record| Some(r.bucket))
            .with_order(0)
            .disabled(),
    );
    groups.add(
        GroupOption::multi("label", |r: &Record| r.labels.clone())
            .with_order(1)
            .disabled(),
    );
    if group_by_bucket {
        groups.by_id("bucket").unwrap().set_enabled(true);
    }
    if group_by_label {
        groups.by_id("label").unwrap().set_enabled(true);
    }

    let controller = CollectionController::new(|r: &Record| r.id)
        .with_filters(filters)
        .with_sorts(sorts)
        .with_groups(groups);
    controller.add_all(data).unwrap();
    let slots = SlotManager::new(&controller);

    Build {
        controller,
        slots,
        bucket_filter,
    }
}

/// Expected appearance count for one record given the enabled levels.
fn expected_appearances(record: &Record, group_by_bucket: bool, group_by_label: bool) -> usize {
    // The bucket level is single-valued, so it never multiplies; the label
    // level multiplies by the label count, except that zero labels leave the
    // record parked at the previous level (one appearance).
    let _ = group_by_bucket;
    if group_by_label {
        record.labels.len().max(1)
    } else {
        1
    }
}

fn check_build(data: &[Record], b: &Build, group_by_bucket: bool, group_by_label: bool) {
    let config = format!("bucket={group_by_bucket} label={group_by_label}");

    // Appearance accounting.
    let expected_total: usize = data
        .iter()
        .map(|r| expected_appearances(r, group_by_bucket, group_by_label))
        .sum();
    assert_eq!(b.controller.len(), expected_total, "appearances ({config})");

    // Every source key is present, each exactly as often as expected.
    let flattened = b.controller.root().flattened_items();
    for record in data {
        let appearances = flattened.iter().filter(|(k, _)| *k == record.id).count();
        assert_eq!(
            appearances,
            expected_appearances(record, group_by_bucket, group_by_label),
            "record {} ({config})",
            record.id
        );
    }

    // Distinct keys survive multiplication.
    let distinct: HashSet<u32> = flattened.iter().map(|(k, _)| *k).collect();
    assert_eq!(distinct.len(), data.len(), "distinct keys ({config})");
    assert_eq!(b.slots.unique_item_count(), data.len(), "unique ({config})");

    // Slot accounting: headers + appearances, fully expanded.
    assert_eq!(
        b.slots.total_slots(),
        b.slots.group_headers().len() + expected_total,
        "slot count ({config})"
    );

    // Every group's direct items obey the comparator.
    for header in b.slots.group_headers() {
        let weights: Vec<i32> = group_weights(b, &header.path);
        let mut sorted = weights.clone();
        sorted.sort_unstable();
        assert_eq!(weights, sorted, "group {} unsorted ({config})", header.path);
    }

    // Collapse everything / expand everything round-trips the slot count.
    let baseline = b.slots.total_slots();
    b.slots.collapse_all();
    assert!(b.slots.total_slots() <= baseline);
    b.slots.expand_all();
    assert_eq!(b.slots.total_slots(), baseline, "collapse round trip ({config})");
}

/// Weights of the direct items of the group at `path`, in item order.
/// (The generated group keys contain no `/`, so splitting is exact here.)
fn group_weights(b: &Build, path: &str) -> Vec<i32> {
    let mut node = Some(b.controller.root());
    for segment in path.split('/') {
        node = node.and_then(|n| n.child(segment));
    }
    node.map(|n| n.items().iter().map(|(_, r)| r.weight).collect())
        .unwrap_or_default()
}

#[test]
fn invariants_hold_across_grouping_configurations() {
    let data = records(120, 5);
    for (by_bucket, by_label) in [(false, false), (true, false), (false, true), (true, true)] {
        let b = build(data.clone(), by_bucket, by_label);
        check_build(&data, &b, by_bucket, by_label);
    }
}

#[test]
fn invariants_hold_under_filtering() {
    let data = records(120, 5);
    let b = build(data.clone(), true, false);
    b.bucket_filter.add_value(2);

    let surviving: Vec<Record> = data.iter().filter(|r| r.bucket == 2).cloned().collect();
    check_build(&surviving, &b, true, false);

    for (_, record) in b.controller.root().flattened_items() {
        assert_eq!(record.bucket, 2);
    }
}

#[test]
fn filter_churn_converges_to_the_unfiltered_projection() {
    let data = records(80, 4);
    let b = build(data.clone(), true, true);
    let baseline: Vec<Slot<Record, u32>> = b.slots.slots();

    for bucket in 0..4u8 {
        b.bucket_filter.add_value(bucket);
        b.bucket_filter.remove_value(&bucket);
    }

    assert_eq!(b.slots.slots(), baseline, "no-op churn must be lossless");
}
