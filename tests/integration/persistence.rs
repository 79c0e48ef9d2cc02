//! Integration tests for durable local persistence.
//!
//! Runs coordinators against `FileStorage` in a scratch directory and
//! restarts them to check what survives.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use tasksync::context::{AppContext, CATEGORIES_KEY, ContextOptions, TASKS_KEY};
use tasksync::remote::RemoteOp;
use tasksync::remote::memory::InMemoryRemote;
use tasksync::storage::file::FileStorage;
use tasksync::storage::{DurableStorage, MemoryStorage};
use tasksync::sync::{LoadOutcome, SyncEvent, TaskSync};
use tasksync_proto::codec::decode_collection;
use tasksync_proto::{
    Category, CategoryDraft, Entity, Priority, Task, TaskDraft, TaskId, TaskPatch, Timestamp,
};

type Ctx = AppContext<InMemoryRemote<Task>, InMemoryRemote<Category>>;

struct ScratchDir(PathBuf);

impl ScratchDir {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("tasksync-it-{}", uuid::Uuid::now_v7())))
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn open(storage: Arc<dyn DurableStorage>) -> Ctx {
    AppContext::with_options(
        InMemoryRemote::new("srv"),
        InMemoryRemote::new("cat"),
        ContextOptions {
            storage: Some(storage),
            ..ContextOptions::default()
        },
    )
}

fn server_task(id: &str, title: &str) -> Task {
    Task::from_draft(TaskId::new(id), &TaskDraft::new(title), Timestamp::from_millis(1_000))
}

#[tokio::test]
async fn committed_state_survives_restart() {
    let dir = ScratchDir::new();
    let storage: Arc<dyn DurableStorage> = Arc::new(FileStorage::new(&dir.0));

    let first = open(Arc::clone(&storage));
    assert_eq!(
        first.load_persisted(),
        (LoadOutcome::Missing, LoadOutcome::Missing)
    );
    let tasks = first.task_sync();
    let keep = tasks
        .create(TaskDraft::new("Buy milk").with_priority(Priority::Low))
        .await
        .unwrap();
    let gone = tasks.create(TaskDraft::new("Old chore")).await.unwrap();
    tasks.toggle_status(&keep.id).await.unwrap();
    tasks.delete(&gone.id).await.unwrap();
    first
        .category_sync()
        .create(CategoryDraft::new("Garden", "#8BC34A"))
        .await
        .unwrap();
    let expected_tasks = tasks.records();
    let expected_categories = first.category_sync().records();
    drop(first);

    let second = open(storage);
    assert_eq!(
        second.load_persisted(),
        (
            LoadOutcome::Restored { count: 1 },
            LoadOutcome::Restored { count: 6 }
        )
    );
    assert_eq!(second.task_sync().records(), expected_tasks);
    assert_eq!(second.category_sync().records(), expected_categories);
    assert!(dir.0.join(format!("{TASKS_KEY}.bin")).exists());
    assert!(dir.0.join(format!("{CATEGORIES_KEY}.bin")).exists());
}

#[tokio::test]
async fn corrupt_collection_falls_back_without_notification() {
    let dir = ScratchDir::new();
    let storage = Arc::new(FileStorage::new(&dir.0));
    storage.save(TASKS_KEY, b"\xff\xfe not a collection").unwrap();

    let mut ctx = open(storage);
    let (tasks, categories) = ctx.load_persisted();
    assert_eq!(tasks, LoadOutcome::Corrupt);
    assert_eq!(categories, LoadOutcome::Missing);
    assert!(ctx.task_sync().is_empty());
    assert_eq!(ctx.categories().names().len(), 5);

    // The corruption is reported as an event but never surfaces in the UI.
    assert_eq!(ctx.pump_events(), 1);
    assert!(ctx.ui().notifications().is_empty());
}

#[tokio::test]
async fn failed_mutations_are_not_persisted() {
    let storage = Arc::new(MemoryStorage::new());
    let ctx = open(Arc::clone(&storage) as Arc<dyn DurableStorage>);
    ctx.load_persisted();
    let tasks = ctx.task_sync();
    let task = tasks.create(TaskDraft::new("Stable")).await.unwrap();
    let saved = storage.load(TASKS_KEY).unwrap().unwrap();

    tasks.remote().fail_next(RemoteOp::Update);
    assert!(tasks.toggle_status(&task.id).await.is_err());
    tasks.remote().fail_next(RemoteOp::Delete);
    assert!(tasks.delete(&task.id).await.is_err());
    tasks.remote().fail_next(RemoteOp::Create);
    assert!(tasks.create(TaskDraft::new("Never")).await.is_err());

    assert_eq!(storage.load(TASKS_KEY).unwrap().unwrap(), saved);
    let on_disk: Vec<Task> = decode_collection(&saved).unwrap();
    assert_eq!(on_disk, vec![task]);
}

#[tokio::test]
async fn fetch_all_persists_remote_collection() {
    let storage = Arc::new(MemoryStorage::new());
    let remote_tasks = vec![
        server_task("srv-3", "From server"),
        server_task("srv-9", "Also from server"),
    ];
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SyncEvent>();
    let sync = TaskSync::new(InMemoryRemote::new("srv").with_records(remote_tasks.clone()), tx)
        .with_storage(Arc::clone(&storage) as Arc<dyn DurableStorage>, TASKS_KEY);

    assert_eq!(sync.fetch_all().await.unwrap(), 2);
    let saved: Vec<Task> = decode_collection(&storage.load(TASKS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(saved, remote_tasks);
    assert_eq!(std::iter::from_fn(|| rx.try_recv().ok()).count(), 2);

    // New creates continue after the highest seeded identifier.
    let created = sync.create(TaskDraft::new("Local")).await.unwrap();
    assert_eq!(created.id, TaskId::new("srv-10"));
}

#[tokio::test]
async fn rolled_back_mutations_stay_out_of_concurrent_commits() {
    let storage = Arc::new(MemoryStorage::new());
    let seed = vec![server_task("srv-1", "Water plants"), server_task("srv-2", "Pay rent")];
    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<SyncEvent>();
    let sync = Arc::new(
        TaskSync::new(InMemoryRemote::new("srv").with_records(seed.clone()), tx)
            .with_storage(Arc::clone(&storage) as Arc<dyn DurableStorage>, TASKS_KEY)
            .with_records(seed),
    );
    sync.remote().pause();

    let update = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move {
            let patch = TaskPatch {
                title: Some("Water all plants".into()),
                ..TaskPatch::default()
            };
            sync.update(&TaskId::new("srv-1"), patch).await
        })
    };
    let ghost = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.create(TaskDraft::new("Ghost")).await })
    };
    let delete = {
        let sync = Arc::clone(&sync);
        tokio::spawn(async move { sync.delete(&TaskId::new("srv-2")).await })
    };
    tokio::time::timeout(std::time::Duration::from_secs(2), async {
        while [RemoteOp::Update, RemoteOp::Create, RemoteOp::Delete]
            .iter()
            .any(|op| sync.remote().call_count(*op) == 0)
        {
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("mutations never reached the remote");

    sync.remote().fail_next(RemoteOp::Create);
    sync.remote().fail_next(RemoteOp::Delete);
    sync.remote().resume();
    update.await.unwrap().unwrap();
    assert!(ghost.await.unwrap().is_err());
    assert!(delete.await.unwrap().is_err());

    let saved: Vec<Task> = decode_collection(&storage.load(TASKS_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(saved, sync.records());
    assert_eq!(
        saved.iter().map(|t| t.title.as_str()).collect::<Vec<_>>(),
        vec!["Water all plants", "Pay rent"]
    );

    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<SyncEvent>();
    let reloaded = TaskSync::new(InMemoryRemote::new("srv"), tx)
        .with_storage(storage as Arc<dyn DurableStorage>, TASKS_KEY);
    assert_eq!(reloaded.load_persisted(Vec::new), LoadOutcome::Restored { count: 2 });
    assert!(reloaded.records().iter().all(|t| !t.id.is_provisional()));
    assert_eq!(reloaded.records(), sync.records());
}
