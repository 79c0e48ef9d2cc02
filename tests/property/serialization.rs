//! Property-based tests for the persisted-collection codec.
//!
//! Uses proptest to verify:
//! 1. Any valid task or category collection survives encode → decode.
//! 2. Random bytes never cause a panic in `decode_collection`.

use proptest::prelude::*;
use tasksync_proto::codec::{decode_collection, encode_collection};
use tasksync_proto::{
    Category, CategoryId, CategoryRef, DueDate, Priority, Task, TaskId, TaskStatus, Timestamp,
};

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![Just(TaskStatus::Active), Just(TaskStatus::Completed)]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High)
    ]
}

fn arb_category_ref() -> impl Strategy<Value = CategoryRef> {
    prop_oneof![
        Just(CategoryRef::Uncategorized),
        "[a-z_0-9]{1,12}".prop_map(|id| CategoryRef::Id(CategoryId::new(id))),
    ]
}

fn arb_due_date() -> impl Strategy<Value = Option<DueDate>> {
    prop::option::of((1970i32..2200, 1u32..=12, 1u32..=28)).prop_map(|ymd| {
        ymd.and_then(|(y, m, d)| DueDate::from_ymd_opt(y, m, d))
    })
}

/// Strategy for tasks whose `updated_at` is never below `created_at`.
fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9-]{1,40}",
        "[^\x00]{1,80}",
        ".{0,200}",
        arb_status(),
        arb_priority(),
        arb_category_ref(),
        arb_due_date(),
        0u64..u64::MAX / 2,
        0u64..1_000_000,
    )
        .prop_map(
            |(id, title, description, status, priority, category, due_date, created, delta)| Task {
                id: TaskId::new(id),
                title,
                description,
                status,
                priority,
                category,
                due_date,
                created_at: Timestamp::from_millis(created),
                updated_at: Timestamp::from_millis(created + delta),
            },
        )
}

fn arb_category() -> impl Strategy<Value = Category> {
    ("[a-z_0-9]{1,12}", "[^\x00]{1,40}", "#[0-9A-F]{6}")
        .prop_map(|(id, name, color)| Category::new(id, name, color))
}

proptest! {
    #[test]
    fn task_collection_round_trip(tasks in prop::collection::vec(arb_task(), 0..32)) {
        let bytes = encode_collection(&tasks).unwrap();
        let decoded: Vec<Task> = decode_collection(&bytes).unwrap();
        prop_assert_eq!(decoded, tasks);
    }

    #[test]
    fn category_collection_round_trip(categories in prop::collection::vec(arb_category(), 0..16)) {
        let bytes = encode_collection(&categories).unwrap();
        let decoded: Vec<Category> = decode_collection(&bytes).unwrap();
        prop_assert_eq!(decoded, categories);
    }

    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_collection::<Task>(&bytes);
        let _ = decode_collection::<Category>(&bytes);
    }
}
