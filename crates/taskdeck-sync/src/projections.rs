//! View shaping over loaded data. Pure; no store or cache access.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use taskdeck_core::derive::{DashboardStats, ProjectStats};
use taskdeck_core::{Project, Task, TaskStatus};

/// Status tabs of the task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusTab {
    /// Every task.
    #[default]
    All,
    /// `todo` only.
    Todo,
    /// `in-progress` only.
    InProgress,
    /// `done` only.
    Done,
}

impl StatusTab {
    /// Every tab in display order.
    pub const ALL: [Self; 4] = [Self::All, Self::Todo, Self::InProgress, Self::Done];

    /// Whether `status` belongs on this tab.
    #[must_use]
    pub fn includes(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Todo => status == TaskStatus::Todo,
            Self::InProgress => status == TaskStatus::InProgress,
            Self::Done => status == TaskStatus::Done,
        }
    }

    /// Wire-style name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for StatusTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "todo" => Ok(Self::Todo),
            "in-progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown tab: {other}")),
        }
    }
}

/// Tasks on `tab` whose title contains `query`, ignoring case. Store order
/// is kept; a blank query matches everything.
#[must_use]
pub fn filter_tasks<'a>(tasks: &'a [Task], tab: StatusTab, query: &str) -> Vec<&'a Task> {
    let needle = query.trim().to_lowercase();
    tasks
        .iter()
        .filter(|t| tab.includes(t.status))
        .filter(|t| needle.is_empty() || t.title.to_lowercase().contains(&needle))
        .collect()
}

/// How many tasks each tab would show.
#[must_use]
pub fn tab_counts(tasks: &[Task]) -> Vec<(StatusTab, usize)> {
    StatusTab::ALL
        .iter()
        .map(|&tab| (tab, tasks.iter().filter(|t| tab.includes(t.status)).count()))
        .collect()
}

/// The first `limit` tasks in store order.
#[must_use]
pub fn recent_tasks(tasks: &[Task], limit: usize) -> &[Task] {
    &tasks[..limit.min(tasks.len())]
}

/// Dashboard: counters over every task plus a short recent list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Total, completed, in-progress, and overdue counts.
    pub stats: DashboardStats,
    /// Leading tasks of the list.
    pub recent: Vec<Task>,
}

impl Dashboard {
    /// Build from the full task list.
    #[must_use]
    pub fn build(tasks: &[Task], recent_limit: usize, now: DateTime<Utc>) -> Self {
        Self {
            stats: DashboardStats::from_tasks(tasks, now),
            recent: recent_tasks(tasks, recent_limit).to_vec(),
        }
    }
}

/// Project page: the project, its task counters, and its tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    /// The project.
    pub project: Project,
    /// Per-status counts.
    pub stats: ProjectStats,
    /// Percent of tasks done, rounded.
    pub progress: u32,
    /// Tasks in the project, store order.
    pub tasks: Vec<Task>,
}

impl ProjectOverview {
    /// Build from a project and the tasks filed under it.
    #[must_use]
    pub fn build(project: Project, tasks: Vec<Task>) -> Self {
        let stats = ProjectStats::from_tasks(&tasks);
        Self {
            project,
            progress: stats.progress(),
            stats,
            tasks,
        }
    }
}

/// Task page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    /// The task.
    pub task: Task,
    /// Checked subtasks.
    pub completed_subtasks: usize,
    /// All subtasks.
    pub total_subtasks: usize,
}

impl TaskDetail {
    /// Build from a loaded task.
    #[must_use]
    pub fn build(task: Task) -> Self {
        Self {
            completed_subtasks: task.completed_subtasks(),
            total_subtasks: task.subtasks.len(),
            task,
        }
    }

    /// `"c of n completed"`.
    #[must_use]
    pub fn subtask_summary(&self) -> String {
        format!("{} of {} completed", self.completed_subtasks, self.total_subtasks)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
