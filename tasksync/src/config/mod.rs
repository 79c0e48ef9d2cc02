//! Configuration for the `tasksync` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasksync/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tasksync_proto::{DueDate, Priority, TaskStatus};

use crate::ui::NotificationDurations;
use crate::view::{CategoryFilter, PriorityFilter, SortDirection, SortField, SortSpec, StatusFilter};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    storage: StorageFileConfig,
    remote: RemoteFileConfig,
    ui: UiFileConfig,
    view: ViewFileConfig,
}

/// `[storage]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct StorageFileConfig {
    data_dir: Option<PathBuf>,
    persist: Option<bool>,
}

/// `[remote]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemoteFileConfig {
    task_id_prefix: Option<String>,
    category_id_prefix: Option<String>,
    latency_ms: Option<u64>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    success_ms: Option<u64>,
    error_ms: Option<u64>,
    warning_ms: Option<u64>,
    info_ms: Option<u64>,
}

/// `[view]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ViewFileConfig {
    sort_field: Option<SortField>,
    sort_direction: Option<SortDirection>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    // -- Storage --
    /// Directory holding the persisted collections.
    pub data_dir: PathBuf,
    /// Whether collections are persisted at all.
    pub persist: bool,

    // -- Remote --
    /// Prefix of identifiers issued for tasks.
    pub task_id_prefix: String,
    /// Prefix of identifiers issued for categories.
    pub category_id_prefix: String,
    /// Simulated latency of every remote call.
    pub remote_latency: Duration,

    // -- UI --
    /// Auto-dismiss durations per notification kind.
    pub notifications: NotificationDurations,

    // -- View --
    /// Sort applied when none is given.
    pub default_sort: SortSpec,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("tasksync"),
            persist: true,
            task_id_prefix: "srv".to_string(),
            category_id_prefix: "cat".to_string(),
            remote_latency: Duration::ZERO,
            notifications: NotificationDurations::default(),
            default_sort: SortSpec::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an
    /// error. Otherwise the default path is tried and silently ignored if
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();
        let durations = defaults.notifications;

        Self {
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.storage.data_dir.clone())
                .unwrap_or(defaults.data_dir),
            persist: !cli.ephemeral && file.storage.persist.unwrap_or(defaults.persist),
            task_id_prefix: file
                .remote
                .task_id_prefix
                .clone()
                .unwrap_or(defaults.task_id_prefix),
            category_id_prefix: file
                .remote
                .category_id_prefix
                .clone()
                .unwrap_or(defaults.category_id_prefix),
            remote_latency: cli
                .latency_ms
                .or(file.remote.latency_ms)
                .map_or(defaults.remote_latency, Duration::from_millis),
            notifications: NotificationDurations {
                success_ms: file.ui.success_ms.unwrap_or(durations.success_ms),
                error_ms: file.ui.error_ms.unwrap_or(durations.error_ms),
                warning_ms: file.ui.warning_ms.unwrap_or(durations.warning_ms),
                info_ms: file.ui.info_ms.unwrap_or(durations.info_ms),
            },
            default_sort: SortSpec {
                field: file.view.sort_field.unwrap_or(defaults.default_sort.field),
                direction: file
                    .view
                    .sort_direction
                    .unwrap_or(defaults.default_sort.direction),
            },
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Optimistic task manager")]
pub struct CliArgs {
    /// Path to config file (default: `~/.config/tasksync/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory holding persisted tasks and categories.
    #[arg(long, env = "TASKSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Do not read or write persisted collections.
    #[arg(long)]
    pub ephemeral: bool,

    /// Simulated remote latency in milliseconds.
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKSYNC_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/tasksync.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do (default: `list`).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands of the `tasksync` binary.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show tasks, filtered and sorted.
    List(ListArgs),
    /// Create a task.
    Add {
        /// Task title.
        title: String,
        /// Longer description.
        #[arg(short, long, default_value = "")]
        description: String,
        /// low, medium or high.
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        /// Category id or name.
        #[arg(long)]
        category: Option<String>,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: Option<DueDate>,
    },
    /// Change fields of a task.
    Edit {
        /// Task id.
        id: String,
        /// New title.
        #[arg(long)]
        title: Option<String>,
        /// New description.
        #[arg(long)]
        description: Option<String>,
        /// New priority.
        #[arg(long)]
        priority: Option<Priority>,
        /// New status.
        #[arg(long)]
        status: Option<TaskStatus>,
        /// New category id or name; `none` removes it.
        #[arg(long)]
        category: Option<String>,
        /// New due date (YYYY-MM-DD).
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<DueDate>,
        /// Remove the due date.
        #[arg(long)]
        clear_due: bool,
    },
    /// Flip a task between active and completed.
    Toggle {
        /// Task id.
        id: String,
    },
    /// Delete a task.
    Rm {
        /// Task id.
        id: String,
    },
    /// List or manage categories.
    Categories {
        /// Category action (default: list).
        #[command(subcommand)]
        action: Option<CategoryCommand>,
    },
    /// Show task counts.
    Stats,
}

/// Flags of the `list` subcommand.
#[derive(clap::Args, Debug, Clone, PartialEq, Eq, Default)]
pub struct ListArgs {
    /// all, active or completed.
    #[arg(long, default_value = "all")]
    pub status: StatusFilter,
    /// all, low, medium or high.
    #[arg(long, default_value = "all")]
    pub priority: PriorityFilter,
    /// all, uncategorized, or a category id.
    #[arg(long, default_value = "all")]
    pub category: CategoryFilter,
    /// Case-insensitive text to look for in title or description.
    #[arg(short, long, default_value = "")]
    pub search: String,
    /// due_date, priority, created_at or title.
    #[arg(long)]
    pub sort: Option<SortField>,
    /// asc or desc.
    #[arg(long)]
    pub direction: Option<SortDirection>,
}

/// Subcommands of `categories`.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CategoryCommand {
    /// Create a category.
    Add {
        /// Display name.
        name: String,
        /// Display color.
        #[arg(long, default_value = "#9E9E9E")]
        color: String,
    },
    /// Delete a category.
    Rm {
        /// Category id.
        id: String,
    },
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("tasksync").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
