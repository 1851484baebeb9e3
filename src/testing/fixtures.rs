//! Pre-built item types, datasets, and a fully wired engine for tests.

use crate::controller::CollectionController;
use crate::filter::{Filter, FilterManager, text_filter};
use crate::group::{GroupManager, GroupOption};
use crate::pagination::PaginationState;
use crate::selection::SelectionManager;
use crate::slots::SlotManager;
use crate::sort::{SortManager, ValueSortOption};

/// The task row used throughout the crate's tests: a category and priority
/// for single-valued grouping, tags for multi-valued grouping, and an
/// optional assignee for folder-like grouping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestTask {
    /// Stable item key.
    pub id: u32,
    /// Display title (searched by the `q` filter).
    pub title: String,
    /// Single-valued group key.
    pub category: String,
    /// Numeric sort/group key.
    pub priority: u8,
    /// Multi-valued group keys.
    pub tags: Vec<String>,
    /// Optional group key; `None` keeps the task at the parent level.
    pub assignee: Option<String>,
}

/// Shorthand constructor for a task with no tags and no assignee.
#[must_use]
pub fn task(id: u32, title: &str, category: &str, priority: u8) -> TestTask {
    TestTask {
        id,
        title: title.to_string(),
        category: category.to_string(),
        priority,
        tags: Vec::new(),
        assignee: None,
    }
}

impl TestTask {
    /// Attach tags (builder form).
    #[must_use]
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(ToString::to_string).collect();
        self
    }

    /// Attach an assignee (builder form).
    #[must_use]
    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }
}

/// Six tasks across two categories and three priorities.
#[must_use]
pub fn sample_tasks() -> Vec<TestTask> {
    vec![
        task(1, "rotate pager duty", "ops", 1),
        task(2, "upgrade database", "ops", 2).with_assignee("ada"),
        task(3, "fix login crash", "dev", 1).with_assignee("ada"),
        task(4, "refactor parser", "dev", 3),
        task(5, "write release notes", "dev", 2).with_assignee("lin"),
        task(6, "renew certificates", "ops", 1).with_assignee("lin"),
    ]
}

/// Tasks carrying overlapping tags, for tag-like grouping tests.
#[must_use]
pub fn tagged_tasks() -> Vec<TestTask> {
    vec![
        task(1, "triage inbox", "ops", 1).with_tags(&["urgent", "email"]),
        task(2, "patch kernel", "ops", 1).with_tags(&["urgent"]),
        task(3, "tidy backlog", "dev", 2).with_tags(&["email"]),
    ]
}

/// The contact row used by the directory-shaped tests: two single-valued
/// group levels (company → city) and a display name to search on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactRow {
    /// Stable item key.
    pub id: u32,
    /// Display name (searched by the `q` filter).
    pub name: String,
    /// First group level.
    pub company: String,
    /// Second group level; `None` keeps the contact at the company level.
    pub city: Option<String>,
}

/// Shorthand constructor for a contact.
#[must_use]
pub fn contact(id: u32, name: &str, company: &str, city: Option<&str>) -> ContactRow {
    ContactRow {
        id,
        name: name.to_string(),
        company: company.to_string(),
        city: city.map(ToString::to_string),
    }
}

/// Eight contacts across three companies, some without a city. Includes
/// non-ASCII names and cities so serialisation tests have something to
/// escape.
#[must_use]
pub fn contact_rows() -> Vec<ContactRow> {
    vec![
        contact(1, "Ada Lovelace", "Analytical", Some("London")),
        contact(2, "Grace Hopper", "Remington", Some("New York")),
        contact(3, "Kurt Gödel", "Analytical", Some("Wien")),
        contact(4, "Alan Turing", "Analytical", None),
        contact(5, "Annie Easley", "NASA", Some("Cleveland")),
        contact(6, "Katherine Johnson", "NASA", Some("Hampton")),
        contact(7, "Mary Jackson", "NASA", Some("Hampton")),
        contact(8, "Niklaus Wirth", "Remington", None),
    ]
}

/// A controller, a slot manager, and every manager wired together over
/// [`TestTask`] rows.
///
/// The managers are also reachable through the controller; the struct keeps
/// direct handles so tests do not have to unwrap `Option`s.
pub struct TaskEngine {
    /// The controller owning the tasks.
    pub controller: CollectionController<TestTask, u32>,
    /// The flattened slot view.
    pub slots: SlotManager<TestTask, u32>,
    /// Attached filter manager.
    pub filters: FilterManager<TestTask>,
    /// Attached sort manager (`prio`, then `title`).
    pub sorts: SortManager<TestTask>,
    /// Attached group manager (`cat` then `prio` enabled; `tag` and `who`
    /// registered but disabled).
    pub groups: GroupManager<TestTask>,
    /// Attached selection manager.
    pub selection: SelectionManager<u32>,
    /// A free-standing pagination state (the engine does no I/O).
    pub pagination: PaginationState,
    /// `cat` filter: exact category match.
    pub category_filter: Filter<TestTask, String>,
    /// `prio` filter: exact priority match.
    pub priority_filter: Filter<TestTask, u8>,
    /// `q` filter: case-insensitive title search.
    pub search: Filter<TestTask, String>,
}

/// Wire a full engine over the given tasks.
///
/// Grouping is `cat` → `prio`; sorting is by `prio` then `title`; the three
/// filters start inactive (pass-through).
#[must_use]
pub fn task_engine(tasks: Vec<TestTask>) -> TaskEngine {
    let category_filter: Filter<TestTask, String> =
        Filter::stringly("cat", |t: &TestTask, v: &String| t.category == *v);
    let priority_filter: Filter<TestTask, u8> =
        Filter::stringly("prio", |t: &TestTask, v: &u8| t.priority == *v);
    let search = text_filter("q", |t: &TestTask| t.title.clone());

    let filters = FilterManager::new();
    filters.add(category_filter.clone());
    filters.add(priority_filter.clone());
    filters.add(search.clone());

    let sorts = SortManager::new();
    sorts.add(ValueSortOption::new("prio", |t: &TestTask| Some(t.priority)));
    sorts.add(ValueSortOption::new("title", |t: &TestTask| {
        Some(t.title.clone())
    }));

    let groups = GroupManager::new();
    groups.add(GroupOption::single("cat", |t: &TestTask| Some(t.category.clone())).with_order(0));
    groups.add(GroupOption::single("prio", |t: &TestTask| Some(t.priority)).with_order(1));
    groups.add(
        GroupOption::multi("tag", |t: &TestTask| t.tags.clone())
            .with_order(2)
            .disabled(),
    );
    groups.add(
        GroupOption::single("who", |t: &TestTask| t.assignee.clone())
            .with_order(3)
            .disabled(),
    );

    let selection = SelectionManager::new();

    let controller = CollectionController::new(|t: &TestTask| t.id)
        .with_filters(filters.clone())
        .with_sorts(sorts.clone())
        .with_groups(groups.clone())
        .with_selection(selection.clone());
    controller
        .add_all(tasks)
        .expect("fixture task ids are unique");

    let slots = SlotManager::new(&controller);

    TaskEngine {
        controller,
        slots,
        filters,
        sorts,
        groups,
        selection,
        pagination: PaginationState::new(),
        category_filter,
        priority_filter,
        search,
    }
}
