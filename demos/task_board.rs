//! A small task board: filter, sort, group, collapse, select, and share the
//! view state as a URL query.
//!
//! Run with `cargo run --example task_board`.

use slotline::snapshot::ViewState;
use slotline::{
    CollectionController, Filter, FilterManager, GroupManager, GroupOption, Slot, SlotManager,
    SortManager, ValueSortOption,
};

#[derive(Clone, Debug)]
struct Task {
    id: u32,
    title: String,
    board: String,
    points: u8,
    labels: Vec<String>,
}

fn task(id: u32, title: &str, board: &str, points: u8, labels: &[&str]) -> Task {
    Task {
        id,
        title: title.to_string(),
        board: board.to_string(),
        points,
        labels: labels.iter().map(ToString::to_string).collect(),
    }
}

fn print_slots<T, K>(slots: &SlotManager<T, K>, render: impl Fn(&T) -> String)
where
    T: slotline::ItemBound,
    K: slotline::KeyBound,
{
    for slot in slots.slots() {
        match slot {
            Slot::Header(h) => println!(
                "{}▸ {} ({} direct, {} total)",
                "  ".repeat(h.depth),
                h.label,
                h.item_count,
                h.total_count
            ),
            Slot::Item(i) => println!("{}- {}", "  ".repeat(i.depth), render(&i.item)),
        }
    }
}

fn main() {
    let board_filter: Filter<Task, String> =
        Filter::stringly("board", |t: &Task, v: &String| t.board == *v);
    let filters = FilterManager::new();
    filters.add(board_filter.clone());

    let sorts = SortManager::new();
    sorts.add(ValueSortOption::new("points", |t: &Task| Some(t.points)));
    sorts.add(ValueSortOption::new("title", |t: &Task| Some(t.title.clone())));

    let groups = GroupManager::new();
    groups.add(GroupOption::single("board", |t: &Task| Some(t.board.clone())).with_order(0));
    groups.add(
        GroupOption::multi("label", |t: &Task| t.labels.clone())
            .with_order(1)
            .disabled(),
    );

    let controller = CollectionController::new(|t: &Task| t.id)
        .with_filters(filters.clone())
        .with_sorts(sorts.clone())
        .with_groups(groups.clone());

    controller
        .add_all(vec![
            task(1, "fix flaky login test", "frontend", 2, &["bug"]),
            task(2, "migrate user table", "backend", 5, &["db", "risky"]),
            task(3, "polish empty states", "frontend", 1, &["design"]),
            task(4, "add audit log", "backend", 3, &["db"]),
            task(5, "upgrade router", "frontend", 3, &["risky"]),
        ])
        .expect("demo task ids are unique");

    let slots = SlotManager::new(&controller);

    println!("== grouped by board, sorted by points then title ==");
    print_slots(&slots, |t| format!("{} ({}pt)", t.title, t.points));

    println!("\n== collapse the backend board ==");
    slots.collapse("board=backend");
    print_slots(&slots, |t| t.title.clone());

    println!("\n== switch to label grouping (tag-like: tasks repeat) ==");
    slots.expand_all();
    groups.by_id("board").expect("registered").set_enabled(false);
    groups.by_id("label").expect("registered").set_enabled(true);
    print_slots(&slots, |t| t.title.clone());
    println!(
        "{} slots, {} unique tasks",
        slots.total_slots(),
        slots.unique_item_count()
    );

    println!("\n== filter to the frontend board ==");
    board_filter.add_value("frontend".to_string());
    print_slots(&slots, |t| t.title.clone());

    let view = ViewState {
        filters: filters.capture_state(),
        sorts: sorts.capture_state(),
        groups: groups.capture_state(),
        ..ViewState::default()
    };
    println!("\nshareable view: ?{}", view.to_query_string());
}
