//! # taskdeck
//!
//! Command-line client: loads settings, connects to the JSON store, and
//! prints dashboard, list, and detail views or applies a single write.

#![deny(unsafe_code)]

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use taskdeck_core::logging::init_subscriber;
use taskdeck_core::validation::{SubtaskDraft, TaskDraft};
use taskdeck_core::{ProjectId, TaskId, TaskPriority, TaskStatus};
use taskdeck_settings::TaskdeckSettings;
use taskdeck_store::HttpStore;
use taskdeck_sync::{StatusTab, TaskDetail, Taskboard};
use tracing::debug;

/// Project and task board client.
#[derive(Parser, Debug)]
#[command(name = "taskdeck", about = "Project and task board client", version)]
struct Cli {
    /// Store base URL (overrides settings).
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log level or filter directive (overrides settings).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Settings file (defaults to `~/.taskdeck/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Counters and recent tasks.
    Dashboard,
    /// List tasks.
    Tasks {
        /// Status tab: all, todo, in-progress, done.
        #[arg(long, default_value = "all")]
        tab: StatusTab,
        /// Case-insensitive title search.
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one task.
    Task {
        /// Task ID.
        id: String,
    },
    /// List projects.
    Projects,
    /// Show a project with its tasks and progress.
    Project {
        /// Project ID.
        id: String,
    },
    /// Check or uncheck a subtask.
    Toggle {
        /// Task ID.
        task: String,
        /// Subtask ID.
        subtask: String,
    },
    /// Set a task's status directly.
    Status {
        /// Task ID.
        task: String,
        /// todo, in-progress, or done.
        status: TaskStatus,
    },
    /// Add a comment.
    Comment {
        /// Task ID.
        task: String,
        /// Author name.
        #[arg(long)]
        author: String,
        /// Comment text.
        text: String,
    },
    /// Add a subtask.
    Subtask {
        /// Task ID.
        task: String,
        /// Subtask title.
        title: String,
    },
    /// Delete a task.
    Delete {
        /// Task ID.
        task: String,
    },
    /// Create a task.
    Create {
        /// Title.
        #[arg(long)]
        title: String,
        /// Description.
        #[arg(long, default_value = "")]
        description: String,
        /// Project ID.
        #[arg(long)]
        project: String,
        /// Due date (`YYYY-MM-DD`).
        #[arg(long, default_value = "")]
        due: String,
        /// low, medium, or high.
        #[arg(long, default_value = "medium")]
        priority: TaskPriority,
        /// todo, in-progress, or done.
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        /// Comma-separated tags.
        #[arg(long, default_value = "")]
        tags: String,
        /// Subtask title (repeatable).
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },
}

/// Load settings and apply command-line overrides.
fn resolve_settings(cli: &Cli) -> Result<TaskdeckSettings> {
    let mut settings = match &cli.settings {
        Some(path) => taskdeck_settings::load_settings_from_path(path),
        None => taskdeck_settings::load_settings(),
    }
    .context("Failed to load settings")?;

    if let Some(url) = &cli.base_url {
        settings.store.base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level.clone_from(level);
    }
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

async fn run(board: &Taskboard, command: Command) -> Result<String> {
    let output = match command {
        Command::Dashboard => {
            let view = board.dashboard().await.context("Couldn't load dashboard")?;
            render::dashboard(&view)
        }
        Command::Tasks { tab, search } => {
            let tasks = board
                .task_list(tab, search.as_deref().unwrap_or(""))
                .await
                .context("Failed to load tasks")?;
            render::task_list(&tasks)
        }
        Command::Task { id } => {
            let view = board
                .task_detail(&TaskId::from(id))
                .await
                .context("Task not found")?;
            render::task_detail(&view)
        }
        Command::Projects => {
            let projects = board.projects().await.context("Failed to load projects")?;
            render::projects(&projects)
        }
        Command::Project { id } => {
            let view = board
                .project_overview(&ProjectId::from(id))
                .await
                .context("Failed to load project")?;
            render::project_overview(&view)
        }
        Command::Toggle { task, subtask } => {
            let task = board.task(&TaskId::from(task)).await.context("Task not found")?;
            let task = board
                .actions()
                .toggle_subtask(&task, &subtask)
                .await
                .context("Failed to update subtask")?;
            render::task_detail(&TaskDetail::build(task))
        }
        Command::Status { task, status } => {
            let task = board.task(&TaskId::from(task)).await.context("Task not found")?;
            let task = board
                .actions()
                .set_status(&task, status)
                .await
                .context("Failed to update status")?;
            render::task_detail(&TaskDetail::build(task))
        }
        Command::Comment { task, author, text } => {
            let task = board.task(&TaskId::from(task)).await.context("Task not found")?;
            let task = board
                .actions()
                .add_comment(&task, &author, &text)
                .await
                .context("Failed to add comment")?;
            render::task_detail(&TaskDetail::build(task))
        }
        Command::Subtask { task, title } => {
            let task = board.task(&TaskId::from(task)).await.context("Task not found")?;
            let task = board
                .actions()
                .add_subtask(&task, &title)
                .await
                .context("Failed to add subtask")?;
            render::task_detail(&TaskDetail::build(task))
        }
        Command::Delete { task } => {
            let task = board.task(&TaskId::from(task)).await.context("Task not found")?;
            board
                .actions()
                .delete_task(&task)
                .await
                .context("Failed to delete task")?;
            format!("Deleted task {} ({})\n", task.title, task.id)
        }
        Command::Create {
            title,
            description,
            project,
            due,
            priority,
            status,
            tags,
            subtasks,
        } => {
            let draft = TaskDraft {
                title,
                description,
                project_id: project,
                priority,
                status,
                due_date: due,
                tags,
                subtasks: subtasks
                    .into_iter()
                    .map(|title| SubtaskDraft {
                        title,
                        ..SubtaskDraft::default()
                    })
                    .collect(),
                comments: Vec::new(),
            };
            let task = board
                .actions()
                .create_task(draft)
                .await
                .context("Failed to create task")?;
            render::task_detail(&TaskDetail::build(task))
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(&cli)?;
    init_subscriber(&settings.logging.level);
    debug!(base_url = %settings.store.base_url, "connecting to store");

    let store = HttpStore::from_settings(&settings.store).context("Failed to create store client")?;
    let board = Taskboard::with_settings(Arc::new(store), &settings);

    let output = run(&board, cli.command).await?;
    print!("{output}");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskdeck_store::{Collection, MemoryStore, StoreOp};

    fn board() -> (Arc<MemoryStore>, Taskboard) {
        let memory = Arc::new(MemoryStore::new());
        memory.seed(Collection::Projects, [json!({"id": "1", "name": "Website"})]);
        memory.seed(
            Collection::Tasks,
            [json!({
                "id": "5", "title": "Hero", "projectId": "1", "status": "todo",
                "subtasks": [{"id": "1", "title": "Copy", "completed": false}]
            })],
        );
        let board = Taskboard::new(memory.clone());
        (memory, board)
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("taskdeck").chain(args.iter().copied())).unwrap()
    }

    // ── Parsing ──────────────────────────────────────────────────────

    #[test]
    fn parses_tab_and_search() {
        let cli = parse(&["tasks", "--tab", "in-progress", "--search", "hero"]);
        match cli.command {
            Command::Tasks { tab, search } => {
                assert_eq!(tab, StatusTab::InProgress);
                assert_eq!(search.as_deref(), Some("hero"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["dashboard", "--base-url", "http://127.0.0.1:9000/"]);
        assert_eq!(cli.base_url.as_deref(), Some("http://127.0.0.1:9000/"));
    }

    #[test]
    fn rejects_unknown_status() {
        let result = Cli::try_parse_from(["taskdeck", "status", "5", "blocked"]);
        assert!(result.is_err());
    }

    #[test]
    fn create_collects_repeated_subtasks() {
        let cli = parse(&[
            "create", "--title", "T", "--project", "1", "--subtask", "a", "--subtask", "b",
        ]);
        match cli.command {
            Command::Create {
                subtasks, priority, ..
            } => {
                assert_eq!(subtasks, vec!["a", "b"]);
                assert_eq!(priority, TaskPriority::Medium);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_overrides_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let cli = parse(&[
            "projects",
            "--settings",
            path.to_str().unwrap(),
            "--base-url",
            "http://store.local:8080/",
            "--log-level",
            "debug",
        ]);
        let settings = resolve_settings(&cli).unwrap();
        assert_eq!(settings.store.base_url, "http://store.local:8080");
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let cli = parse(&[
            "projects",
            "--settings",
            path.to_str().unwrap(),
            "--base-url",
            "store.local",
        ]);
        assert!(resolve_settings(&cli).is_err());
    }

    // ── Commands ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn toggle_prints_rederived_status() {
        let (_, board) = board();
        let out = run(&board, parse(&["toggle", "5", "1"]).command).await.unwrap();
        assert!(out.contains("Status: done"));
        assert!(out.contains("1 of 1 completed"));
    }

    #[tokio::test]
    async fn create_then_list() {
        let (memory, board) = board();
        let out = run(
            &board,
            parse(&[
                "create", "--title", "Footer", "--description", "Links", "--project", "1",
                "--due", "2030-01-01", "--tags", "web",
            ])
            .command,
        )
        .await
        .unwrap();
        assert!(out.contains("Footer"));
        assert_eq!(memory.call_count(StoreOp::Create), 1);

        let out = run(&board, parse(&["tasks", "--search", "foot"]).command)
            .await
            .unwrap();
        assert!(out.contains("Footer"));
        assert!(!out.contains("Hero"));
    }

    #[tokio::test]
    async fn invalid_create_reports_fields() {
        let (memory, board) = board();
        let err = run(&board, parse(&["create", "--title", "x", "--project", "1"]).command)
            .await
            .unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("Failed to create task"));
        assert!(chain.contains("Due date is required"));
        assert_eq!(memory.call_count(StoreOp::Create), 0);
    }

    #[tokio::test]
    async fn missing_task_has_context() {
        let (_, board) = board();
        let err = run(&board, parse(&["task", "nope"]).command).await.unwrap_err();
        assert!(format!("{err:#}").contains("Task not found"));
    }

    #[tokio::test]
    async fn project_view_shows_progress() {
        let (_, board) = board();
        let out = run(&board, parse(&["project", "1"]).command).await.unwrap();
        assert!(out.contains("Progress 0%"));
        assert!(out.contains("Hero"));
    }
}
