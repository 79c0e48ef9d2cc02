//! Integration tests for optimistic mutations and reconciliation.
//!
//! Drives `SyncCoordinator` against `InMemoryRemote`, pausing the remote
//! to observe optimistic state and ordering while calls are in flight.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use tasksync::context::AppContext;
use tasksync::remote::memory::InMemoryRemote;
use tasksync::remote::{RemoteError, RemoteOp};
use tasksync::sync::{SyncError, SyncEvent, SyncOp, TaskSync};
use tasksync::ui::NotificationKind;
use tasksync_proto::{
    Category, Entity, Priority, Task, TaskDraft, TaskId, TaskPatch, TaskStatus, Timestamp,
};

type Tasks = TaskSync<InMemoryRemote<Task>>;

/// Coordinator whose store and remote both hold `titles` as `srv-1..n`.
fn seeded(titles: &[&str]) -> (Arc<Tasks>, mpsc::UnboundedReceiver<SyncEvent>) {
    let tasks: Vec<Task> = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            Task::from_draft(
                TaskId::new(format!("srv-{}", i + 1)),
                &TaskDraft::new(*title),
                Timestamp::from_millis(1_000 + i as u64),
            )
        })
        .collect();
    let (tx, rx) = mpsc::unbounded_channel();
    let remote = InMemoryRemote::new("srv").with_records(tasks.clone());
    (Arc::new(TaskSync::new(remote, tx).with_records(tasks)), rx)
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn titles(sync: &Tasks) -> Vec<String> {
    sync.records().into_iter().map(|t| t.title).collect()
}

fn rename(title: &str) -> TaskPatch {
    TaskPatch {
        title: Some(title.to_string()),
        ..TaskPatch::default()
    }
}

#[tokio::test]
async fn buy_milk_end_to_end() {
    let mut ctx = AppContext::new(
        InMemoryRemote::<Task>::new("srv"),
        InMemoryRemote::<Category>::new("cat"),
    );
    ctx.load_persisted();
    let sync = Arc::clone(ctx.task_sync());

    // Create with the remote held: the provisional record is visible at once.
    sync.remote().pause();
    let create = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move {
            sync.create(
                TaskDraft::new("Buy milk")
                    .with_priority(Priority::Low)
                    .with_category("cat_3"),
            )
            .await
        })
    };
    wait_until(|| sync.len() == 1).await;
    let provisional = sync.records().remove(0);
    assert!(provisional.id.is_provisional());
    assert_eq!(provisional.title, "Buy milk");

    sync.remote().resume();
    let created = create.await.unwrap().unwrap();
    assert_eq!(created.id, TaskId::new("srv-1"));
    let all = sync.records();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id.as_str(), "srv-1");
    assert_eq!(all[0].title, "Buy milk");
    assert_eq!(ctx.categories().resolve(&all[0].category).name, "Shopping");

    // Delete fails remotely: the record comes back.
    sync.remote().fail_next(RemoteOp::Delete);
    let err = sync.delete(&TaskId::new("srv-1")).await.unwrap_err();
    assert!(matches!(err, SyncError::Remote(RemoteError::Unavailable(_))));
    assert_eq!(sync.records(), all);

    ctx.pump_events();
    let errors: Vec<_> = ctx
        .ui()
        .notifications()
        .iter()
        .filter(|n| n.kind == NotificationKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Failed to delete task"));
}

#[tokio::test]
async fn failed_update_restores_collection_exactly() {
    let (sync, _rx) = seeded(&["a", "b", "c"]);
    let before = sync.read(|store| store.snapshot());

    sync.remote().fail_next(RemoteOp::Update);
    let patch = TaskPatch {
        title: Some("changed".into()),
        priority: Some(Priority::High),
        due_date: Some(None),
        ..TaskPatch::default()
    };
    assert!(sync.update(&TaskId::new("srv-2"), patch).await.is_err());
    assert_eq!(sync.read(|store| store.snapshot()), before);
}

#[tokio::test]
async fn failed_delete_reinserts_at_original_position() {
    let (sync, _rx) = seeded(&["a", "b", "c"]);
    let before = sync.records();

    sync.remote().fail_next(RemoteOp::Delete);
    assert!(sync.delete(&TaskId::new("srv-2")).await.is_err());
    assert_eq!(sync.records(), before);
}

#[tokio::test]
async fn failed_create_leaves_no_trace() {
    let (sync, mut rx) = seeded(&["a"]);
    let before = sync.records();

    sync.remote().fail_next_with(RemoteOp::Create, RemoteError::Rejected("quota".into()));
    let err = sync.create(TaskDraft::new("b")).await.unwrap_err();
    assert_eq!(err, SyncError::Remote(RemoteError::Rejected("quota".into())));
    assert_eq!(sync.records(), before);

    let mut failures = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, SyncEvent::Failed { op: SyncOp::Create, .. }) {
            failures += 1;
        }
    }
    assert_eq!(failures, 1);
}

#[tokio::test]
async fn toggle_twice_is_identity_on_status() {
    let (sync, _rx) = seeded(&["a"]);
    let id = TaskId::new("srv-1");
    let original = sync.get(&id).unwrap();

    sync.toggle_status(&id).await.unwrap();
    let after = sync.toggle_status(&id).await.unwrap();
    assert_eq!(after.status, original.status);
    assert_eq!(after.title, original.title);
    assert_eq!(after.created_at, original.created_at);
    // Seeded at 1s past the epoch; each remote commit stamps the current time.
    assert!(after.updated_at > original.updated_at);
    assert!(after.updated_at > after.created_at);
}

#[tokio::test]
async fn concurrent_toggles_on_one_task_each_flip() {
    let (sync, _rx) = seeded(&["a"]);
    let id = TaskId::new("srv-1");

    let toggles = (0..3).map(|_| {
        let sync = Arc::clone(&sync);
        let id = id.clone();
        tokio::spawn(async move { sync.toggle_status(&id).await })
    });
    for result in futures_util::future::join_all(toggles).await {
        result.unwrap().unwrap();
    }
    // Three serialized flips from Active end at Completed.
    assert_eq!(sync.get(&id).unwrap().status, TaskStatus::Completed);
    assert_eq!(sync.remote().records()[0].status, TaskStatus::Completed);
}

#[tokio::test]
async fn same_id_operations_run_in_issue_order() {
    let (sync, _rx) = seeded(&["a"]);
    let id = TaskId::new("srv-1");
    sync.remote().pause();

    let first = {
        let (sync, id) = (Arc::clone(&sync), id.clone());
        tokio::spawn(async move { sync.update(&id, rename("one")).await })
    };
    wait_until(|| sync.remote().call_count(RemoteOp::Update) == 1).await;

    let second = {
        let (sync, id) = (Arc::clone(&sync), id.clone());
        tokio::spawn(async move { sync.update(&id, rename("two")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    // The second update waits for the first to reconcile.
    assert_eq!(sync.remote().call_count(RemoteOp::Update), 1);
    assert_eq!(sync.get(&id).unwrap().title, "one");

    sync.remote().resume();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();
    assert_eq!(sync.get(&id).unwrap().title, "two");
    assert_eq!(sync.remote().records()[0].title, "two");
}

#[tokio::test]
async fn different_ids_proceed_concurrently() {
    let (sync, _rx) = seeded(&["a", "b", "c"]);
    sync.remote().pause();

    let handles: Vec<_> = ["srv-1", "srv-2", "srv-3"]
        .into_iter()
        .map(|id| {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.toggle_status(&TaskId::new(id)).await })
        })
        .collect();
    wait_until(|| sync.remote().call_count(RemoteOp::Update) == 3).await;
    // All three are optimistic at once.
    assert!(
        sync.records()
            .iter()
            .all(|t| t.status == TaskStatus::Completed)
    );

    sync.remote().resume();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn update_queued_behind_delete_fails_locally() {
    let (sync, _rx) = seeded(&["a"]);
    let id = TaskId::new("srv-1");
    sync.remote().pause();

    let delete = {
        let (sync, id) = (Arc::clone(&sync), id.clone());
        tokio::spawn(async move { sync.delete(&id).await })
    };
    wait_until(|| sync.remote().call_count(RemoteOp::Delete) == 1).await;
    let update = {
        let (sync, id) = (Arc::clone(&sync), id.clone());
        tokio::spawn(async move { sync.update(&id, rename("late")).await })
    };

    sync.remote().resume();
    delete.await.unwrap().unwrap();
    let err = update.await.unwrap().unwrap_err();
    assert!(matches!(err, SyncError::NotFoundLocal { .. }));
    assert_eq!(sync.remote().call_count(RemoteOp::Update), 0);
    assert!(sync.is_empty());
}

#[tokio::test]
async fn fetch_all_waits_for_in_flight_mutations() {
    let (sync, _rx) = seeded(&["a"]);
    sync.remote().pause();

    let update = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.update(&TaskId::new("srv-1"), rename("edited")).await })
    };
    wait_until(|| sync.remote().call_count(RemoteOp::Update) == 1).await;

    let fetch = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.fetch_all().await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sync.remote().call_count(RemoteOp::List), 0);

    sync.remote().resume();
    update.await.unwrap().unwrap();
    assert_eq!(fetch.await.unwrap().unwrap(), 1);
    assert_eq!(sync.remote().call_count(RemoteOp::List), 1);
    assert_eq!(titles(&sync), vec!["edited"]);
}

#[tokio::test]
async fn committed_create_keeps_provisional_position() {
    let (sync, _rx) = seeded(&["a", "b"]);
    sync.remote().pause();

    let spawn_create = |title: &'static str| {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.create(TaskDraft::new(title)).await })
    };
    let x = spawn_create("x");
    wait_until(|| sync.len() == 3).await;
    let y = spawn_create("y");
    wait_until(|| sync.len() == 4).await;

    sync.remote().resume();
    x.await.unwrap().unwrap();
    y.await.unwrap().unwrap();

    assert_eq!(titles(&sync), vec!["a", "b", "x", "y"]);
    assert!(sync.records().iter().all(|t| !t.id.is_provisional()));
}

#[tokio::test]
async fn fetch_failure_leaves_state_and_reports_once() {
    let (sync, mut rx) = seeded(&["a", "b"]);
    let before = sync.records();
    sync.remote().fail_all(Some(RemoteError::Timeout));

    assert_eq!(
        sync.fetch_all().await.unwrap_err(),
        SyncError::Remote(RemoteError::Timeout)
    );
    assert_eq!(sync.records(), before);

    let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        events,
        vec![
            SyncEvent::Started {
                kind: tasksync_proto::EntityKind::Task,
                op: SyncOp::FetchAll,
            },
            SyncEvent::Failed {
                kind: tasksync_proto::EntityKind::Task,
                op: SyncOp::FetchAll,
                error: SyncError::Remote(RemoteError::Timeout),
            },
        ]
    );
}
