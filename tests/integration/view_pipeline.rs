//! Integration tests for the derived task view.
//!
//! Covers filter composition, search, sort stability and the
//! filter-then-search-then-sort pipeline as seen through `AppContext`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use chrono::NaiveDate;
use proptest::prelude::*;

use tasksync::context::AppContext;
use tasksync::remote::memory::InMemoryRemote;
use tasksync::view::{
    CategoryFilter, PriorityFilter, SortDirection, SortField, SortSpec, StatusFilter,
    ViewCriteria, derive_view,
};
use tasksync_proto::{
    Category, CategoryRef, Entity, Priority, Task, TaskDraft, TaskId, TaskStatus, Timestamp,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn task(id: &str, draft: TaskDraft, created: u64) -> Task {
    Task::from_draft(TaskId::new(id), &draft, Timestamp::from_millis(created))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
}

/// Small mixed collection used by most tests.
fn sample() -> Vec<Task> {
    vec![
        task(
            "t1",
            TaskDraft::new("Team Meeting")
                .with_priority(Priority::High)
                .with_category("cat_1")
                .with_due_date(date(2024, 3, 10)),
            100,
        ),
        task(
            "t2",
            TaskDraft::new("Buy milk")
                .with_priority(Priority::Low)
                .with_category("cat_3"),
            200,
        ),
        task(
            "t3",
            TaskDraft::new("File taxes")
                .with_description("before the meeting with the accountant")
                .with_priority(Priority::High)
                .with_category("cat_5")
                .with_due_date(date(2024, 4, 15))
                .with_status(TaskStatus::Completed),
            300,
        ),
        task(
            "t4",
            TaskDraft::new("stretch")
                .with_priority(Priority::Medium)
                .with_due_date(date(2024, 3, 1)),
            400,
        ),
        task(
            "t5",
            TaskDraft::new("Call plumber").with_priority(Priority::High),
            500,
        ),
    ]
}

// ---------------------------------------------------------------------------
// Filters and search
// ---------------------------------------------------------------------------

#[test]
fn active_high_priority_filter_composes() {
    let criteria = ViewCriteria::default()
        .with_status(StatusFilter::Active)
        .with_priority(PriorityFilter::Only(Priority::High))
        .with_sort(SortSpec::new(SortField::CreatedAt, SortDirection::Ascending));
    assert_eq!(ids(&derive_view(&sample(), &criteria)), vec!["t1", "t5"]);
}

#[test]
fn category_filter_distinguishes_uncategorized() {
    let tasks = sample();
    let by_created = SortSpec::new(SortField::CreatedAt, SortDirection::Ascending);

    let shopping = ViewCriteria::sorted_by(by_created)
        .with_category(CategoryFilter::Id("cat_3".into()));
    assert_eq!(ids(&derive_view(&tasks, &shopping)), vec!["t2"]);

    let loose = ViewCriteria::sorted_by(by_created).with_category(CategoryFilter::Uncategorized);
    assert_eq!(ids(&derive_view(&tasks, &loose)), vec!["t4", "t5"]);
}

#[test]
fn search_is_case_insensitive_over_title_and_description() {
    let criteria = ViewCriteria::sorted_by(SortSpec::new(
        SortField::CreatedAt,
        SortDirection::Ascending,
    ))
    .with_search("meeting");
    // "Team Meeting" by title, "File taxes" by description.
    assert_eq!(ids(&derive_view(&sample(), &criteria)), vec!["t1", "t3"]);
}

#[test]
fn blank_search_matches_everything() {
    let criteria = ViewCriteria::default().with_search("   ");
    assert!(!criteria.is_filtered());
    assert_eq!(derive_view(&sample(), &criteria).len(), 5);
}

#[test]
fn search_applies_after_filters() {
    let criteria = ViewCriteria::default()
        .with_status(StatusFilter::Active)
        .with_search("meeting");
    assert_eq!(ids(&derive_view(&sample(), &criteria)), vec!["t1"]);
}

#[test]
fn no_matches_yields_empty_view() {
    let criteria = ViewCriteria::default().with_search("dentist");
    assert!(derive_view(&sample(), &criteria).is_empty());
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[test]
fn due_date_ascending_puts_undated_last() {
    let criteria = ViewCriteria::default();
    assert_eq!(
        ids(&derive_view(&sample(), &criteria)),
        vec!["t4", "t1", "t3", "t2", "t5"]
    );
}

#[test]
fn due_date_descending_puts_undated_first() {
    let criteria =
        ViewCriteria::sorted_by(SortSpec::new(SortField::DueDate, SortDirection::Descending));
    assert_eq!(
        ids(&derive_view(&sample(), &criteria)),
        vec!["t2", "t5", "t3", "t1", "t4"]
    );
}

#[test]
fn priority_sort_is_stable_for_ties() {
    let desc = ViewCriteria::sorted_by(SortSpec::new(SortField::Priority, SortDirection::Descending));
    assert_eq!(
        ids(&derive_view(&sample(), &desc)),
        vec!["t1", "t3", "t5", "t4", "t2"]
    );

    let asc = ViewCriteria::sorted_by(SortSpec::new(SortField::Priority, SortDirection::Ascending));
    assert_eq!(
        ids(&derive_view(&sample(), &asc)),
        vec!["t2", "t4", "t1", "t3", "t5"]
    );
}

#[test]
fn title_sort_ignores_case() {
    let criteria = ViewCriteria::sorted_by(SortSpec::new(SortField::Title, SortDirection::Ascending));
    assert_eq!(
        ids(&derive_view(&sample(), &criteria)),
        vec!["t2", "t5", "t3", "t4", "t1"]
    );
}

// ---------------------------------------------------------------------------
// Through the context
// ---------------------------------------------------------------------------

#[tokio::test]
async fn context_view_tracks_store_and_criteria() {
    let mut ctx = AppContext::new(
        InMemoryRemote::<Task>::new("srv"),
        InMemoryRemote::<Category>::new("cat"),
    );
    ctx.load_persisted();
    let sync = std::sync::Arc::clone(ctx.task_sync());
    for draft in [
        TaskDraft::new("Weekly meeting notes").with_priority(Priority::High),
        TaskDraft::new("Water plants"),
        TaskDraft::new("Meeting room booking").with_priority(Priority::High),
    ] {
        sync.create(draft).await.unwrap();
    }

    *ctx.criteria_mut() = ViewCriteria::sorted_by(SortSpec::new(
        SortField::Title,
        SortDirection::Ascending,
    ))
    .with_search("MEETING");
    let titles: Vec<_> = ctx.visible_tasks().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Meeting room booking", "Weekly meeting notes"]);

    // Completing one task changes the view but not the stored order.
    let first = sync.records()[0].id.clone();
    sync.toggle_status(&first).await.unwrap();
    ctx.criteria_mut().status = StatusFilter::Active;
    assert_eq!(ctx.visible_tasks().len(), 1);
    assert_eq!(sync.records()[0].id, first);

    ctx.clear_filters();
    assert_eq!(ctx.visible_tasks().len(), 3);
    assert_eq!(ctx.criteria().sort.field, SortField::Title);

    let stats = ctx.stats();
    assert_eq!((stats.total, stats.active, stats.completed), (3, 2, 1));
    assert_eq!(stats.high_priority, 1);
    assert_eq!(
        ctx.categories().resolve(&CategoryRef::Uncategorized).name,
        "Uncategorized"
    );
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-z]{1,8}",
        prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)],
        any::<bool>(),
        proptest::option::of(0u32..60),
        0u64..1_000,
    )
        .prop_map(|(title, priority, done, due, created)| {
            let mut draft = TaskDraft::new(title.as_str()).with_priority(priority);
            if done {
                draft = draft.with_status(TaskStatus::Completed);
            }
            if let Some(offset) = due {
                draft = draft.with_due_date(date(2024, 1, 1) + chrono::Days::new(offset.into()));
            }
            task(&format!("p-{title}-{created}"), draft, created)
        })
}

fn arb_sort() -> impl Strategy<Value = SortSpec> {
    (
        prop_oneof![
            Just(SortField::DueDate),
            Just(SortField::Priority),
            Just(SortField::CreatedAt),
            Just(SortField::Title),
        ],
        prop_oneof![Just(SortDirection::Ascending), Just(SortDirection::Descending)],
    )
        .prop_map(|(field, direction)| SortSpec::new(field, direction))
}

proptest! {
    #[test]
    fn view_is_sorted_filtered_subset(
        tasks in proptest::collection::vec(arb_task(), 0..20),
        sort in arb_sort(),
        active_only in any::<bool>(),
    ) {
        let status = if active_only { StatusFilter::Active } else { StatusFilter::All };
        let criteria = ViewCriteria::sorted_by(sort).with_status(status);
        let view = derive_view(&tasks, &criteria);

        let expected = tasks.iter().filter(|t| criteria.matches(t)).count();
        prop_assert_eq!(view.len(), expected);
        for pair in view.windows(2) {
            prop_assert_ne!(sort.compare(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }
    }

    #[test]
    fn derive_view_leaves_input_untouched(
        tasks in proptest::collection::vec(arb_task(), 0..20),
        sort in arb_sort(),
    ) {
        let before = tasks.clone();
        let _ = derive_view(&tasks, &ViewCriteria::sorted_by(sort));
        prop_assert_eq!(tasks, before);
    }
}
