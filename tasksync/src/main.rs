//! `tasksync`: command-line front end for the optimistic task store.
//!
//! Restores the persisted collections, runs one command through the sync
//! coordinators, then prints the resulting view and notification queue.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/tasksync/config.toml`).
//!
//! ```bash
//! cargo run --bin tasksync -- add "Buy milk" --priority high --category Shopping
//! cargo run --bin tasksync -- list --status active --sort priority --direction desc
//! cargo run --bin tasksync -- toggle srv-1
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use tasksync::config::{CategoryCommand, CliArgs, ClientConfig, Command, ListArgs};
use tasksync::context::{AppContext, ContextOptions};
use tasksync::remote::memory::InMemoryRemote;
use tasksync::storage::DurableStorage;
use tasksync::storage::file::FileStorage;
use tasksync::sync::SyncError;
use tasksync::ui::UiState;
use tasksync::view::{CategoryDirectory, SortSpec};
use tasksync_proto::{
    Category, CategoryDraft, CategoryId, CategoryRef, Task, TaskDraft, TaskId, TaskPatch,
    TaskStatus,
};

type Context = AppContext<InMemoryRemote<Task>, InMemoryRemote<Category>>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(data_dir = %config.data_dir.display(), persist = config.persist, "tasksync starting");

    let mut ctx = build_context(&config);
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| Command::List(ListArgs::default()));
    let result = run_command(&mut ctx, command).await;

    ctx.pump_events();
    print_notifications(ctx.ui());
    tracing::info!(ok = result.is_ok(), "tasksync exiting");

    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Initialize file-based logging.
///
/// Logs go to a file so stdout carries only command output.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tasksync.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Wire the context, restore persisted state and seed the in-process
/// remotes with it so they agree with the local stores.
fn build_context(config: &ClientConfig) -> Context {
    let storage = config
        .persist
        .then(|| Arc::new(FileStorage::new(&config.data_dir)) as Arc<dyn DurableStorage>);
    let task_remote =
        InMemoryRemote::new(config.task_id_prefix.as_str()).with_latency(config.remote_latency);
    let category_remote =
        InMemoryRemote::new(config.category_id_prefix.as_str()).with_latency(config.remote_latency);

    let ctx = AppContext::with_options(
        task_remote,
        category_remote,
        ContextOptions {
            storage,
            notifications: config.notifications,
            default_sort: config.default_sort,
        },
    );
    let (tasks, categories) = ctx.load_persisted();
    tracing::debug!(?tasks, ?categories, "persisted state loaded");
    ctx.task_sync().remote().seed(ctx.task_sync().records());
    ctx.category_sync()
        .remote()
        .seed(ctx.category_sync().records());
    ctx
}

async fn run_command(ctx: &mut Context, command: Command) -> Result<(), SyncError> {
    match command {
        Command::List(args) => {
            let default_sort = ctx.criteria().sort;
            let criteria = ctx.criteria_mut();
            criteria.status = args.status;
            criteria.priority = args.priority;
            criteria.category = args.category;
            criteria.search = args.search;
            criteria.sort = SortSpec::new(
                args.sort.unwrap_or(default_sort.field),
                args.direction.unwrap_or(default_sort.direction),
            );
            print_tasks(&ctx.visible_tasks(), &ctx.categories());
        }
        Command::Add {
            title,
            description,
            priority,
            category,
            due,
        } => {
            let directory = ctx.categories();
            let draft = TaskDraft {
                title,
                description,
                status: None,
                priority,
                category: category
                    .as_deref()
                    .map_or(CategoryRef::Uncategorized, |c| resolve_category(&directory, c)),
                due_date: due,
            };
            let task = ctx.task_sync().create(draft).await?;
            print_tasks(&[task], &directory);
        }
        Command::Edit {
            id,
            title,
            description,
            priority,
            status,
            category,
            due,
            clear_due,
        } => {
            let directory = ctx.categories();
            let patch = TaskPatch {
                title,
                description,
                status,
                priority,
                category: category.as_deref().map(|c| resolve_category(&directory, c)),
                due_date: if clear_due { Some(None) } else { due.map(Some) },
            };
            let task = ctx.task_sync().update(&TaskId::new(id), patch).await?;
            print_tasks(&[task], &directory);
        }
        Command::Toggle { id } => {
            let task = ctx.task_sync().toggle_status(&TaskId::new(id)).await?;
            print_tasks(&[task], &ctx.categories());
        }
        Command::Rm { id } => {
            ctx.task_sync().delete(&TaskId::new(id)).await?;
        }
        Command::Categories { action: None } => {
            let tasks = ctx.task_sync().records();
            for (category, count) in ctx.categories().task_counts(&tasks) {
                println!(
                    "{:<10} {:<8} {:<20} {count}",
                    category.id.as_str(),
                    category.color,
                    category.name
                );
            }
        }
        Command::Categories {
            action: Some(CategoryCommand::Add { name, color }),
        } => {
            let category = ctx
                .category_sync()
                .create(CategoryDraft::new(name, color))
                .await?;
            println!("{:<10} {:<8} {}", category.id.as_str(), category.color, category.name);
        }
        Command::Categories {
            action: Some(CategoryCommand::Rm { id }),
        } => {
            ctx.category_sync().delete(&CategoryId::new(id)).await?;
        }
        Command::Stats => {
            let stats = ctx.stats();
            println!("total:         {}", stats.total);
            println!("active:        {}", stats.active);
            println!("completed:     {}", stats.completed);
            println!("high priority: {}", stats.high_priority);
        }
    }
    Ok(())
}

/// Map a user-supplied category to a reference: a name (any case), an
/// id, or `none`. Unknown values are kept as ids.
fn resolve_category(directory: &CategoryDirectory, input: &str) -> CategoryRef {
    if input.eq_ignore_ascii_case("none") || input.eq_ignore_ascii_case("uncategorized") {
        return CategoryRef::Uncategorized;
    }
    directory.find_by_name(input).map_or_else(
        || CategoryRef::Id(CategoryId::new(input)),
        |c| CategoryRef::Id(c.id.clone()),
    )
}

fn print_tasks(tasks: &[Task], directory: &CategoryDirectory) {
    if tasks.is_empty() {
        println!("(no tasks)");
        return;
    }
    for task in tasks {
        let done = if task.status == TaskStatus::Completed { 'x' } else { ' ' };
        let due = task
            .due_date
            .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
        let category = directory.resolve(&task.category);
        println!(
            "{:<12} [{done}] {:<6} {due:<10} {:<12} {}",
            task.id.as_str(),
            task.priority.to_string(),
            category.name,
            task.title
        );
    }
}

fn print_notifications(ui: &UiState) {
    for notification in ui.notifications() {
        eprintln!("[{}] {}", notification.kind, notification.message);
    }
}
