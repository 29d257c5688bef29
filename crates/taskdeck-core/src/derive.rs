//! Pure derivation rules.
//!
//! Everything here is synchronous, total over well-formed input, and free of
//! side effects:
//!
//! - **Task status from subtasks**: none checked → `todo`, some → `in-progress`,
//!   all → `done`. An empty list leaves the status alone.
//! - **Project progress**: `round(done / total * 100)`, `0` for no tasks.
//! - **Dashboard counters**: total, completed, in progress, overdue.
//! - **Local IDs**: `max(numeric ids) + 1`, starting at `1`.
//!
//! Status derivation and a direct status change are two independent paths.
//! A task can be set to `done` with open subtasks; the next subtask change
//! re-derives the status from the list again.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Subtask, Task, TaskStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Task status
// ─────────────────────────────────────────────────────────────────────────────

/// Status implied by `completed` of `total` checked subtasks.
///
/// Returns `None` for an empty list: derivation does not apply.
#[must_use]
pub fn status_for_counts(completed: usize, total: usize) -> Option<TaskStatus> {
    if total == 0 {
        None
    } else if completed == 0 {
        Some(TaskStatus::Todo)
    } else if completed < total {
        Some(TaskStatus::InProgress)
    } else {
        Some(TaskStatus::Done)
    }
}

/// Derive a task's status after its subtask list changed.
///
/// `current` is kept when the list is empty.
#[must_use]
pub fn derive_status(subtasks: &[Subtask], current: TaskStatus) -> TaskStatus {
    let completed = subtasks.iter().filter(|s| s.completed).count();
    status_for_counts(completed, subtasks.len()).unwrap_or(current)
}

// ─────────────────────────────────────────────────────────────────────────────
// Progress and counters
// ─────────────────────────────────────────────────────────────────────────────

/// `round(completed / total * 100)` with halves rounded up; `0` when `total == 0`.
#[must_use]
pub fn progress_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u64;
    let total = total as u64;
    ((200 * completed + total) / (2 * total)) as u32
}

/// Percentage of a project's tasks that are done.
#[must_use]
pub fn project_progress(tasks: &[Task]) -> u32 {
    let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    progress_percent(done, tasks.len())
}

/// Aggregate counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Every task.
    pub total: usize,
    /// Tasks with status `done`.
    pub completed: usize,
    /// Tasks with status `in-progress`.
    pub in_progress: usize,
    /// Open tasks whose due date has passed.
    pub overdue: usize,
}

impl DashboardStats {
    /// Fold a task list into the four counters in one pass.
    #[must_use]
    pub fn from_tasks(tasks: &[Task], now: DateTime<Utc>) -> Self {
        tasks.iter().fold(Self::default(), |mut acc, task| {
            acc.total += 1;
            match task.status {
                TaskStatus::Done => acc.completed += 1,
                TaskStatus::InProgress => acc.in_progress += 1,
                TaskStatus::Todo => {}
            }
            if is_overdue(task, now) {
                acc.overdue += 1;
            }
            acc
        })
    }
}

/// Per-status counters for one project's tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStats {
    /// Every task in the project.
    pub total: usize,
    /// Tasks with status `done`.
    pub completed: usize,
    /// Tasks with status `in-progress`.
    pub in_progress: usize,
    /// Tasks with status `todo`.
    pub todo: usize,
}

impl ProjectStats {
    /// Count a project's tasks by status.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut acc, task| {
            acc.total += 1;
            match task.status {
                TaskStatus::Done => acc.completed += 1,
                TaskStatus::InProgress => acc.in_progress += 1,
                TaskStatus::Todo => acc.todo += 1,
            }
            acc
        })
    }

    /// Completion percentage for these counters.
    #[must_use]
    pub fn progress(&self) -> u32 {
        progress_percent(self.completed, self.total)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Due dates
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a stored due date.
///
/// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM:SS` (read as UTC), or a
/// bare `YYYY-MM-DD` (UTC midnight). Anything else yields `None`.
#[must_use]
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Whether a task is open and past its due date.
///
/// Tasks without a due date, or with one that does not parse, are never overdue.
#[must_use]
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    if task.status == TaskStatus::Done {
        return false;
    }
    task.due_date
        .as_deref()
        .and_then(parse_due_date)
        .is_some_and(|due| due < now)
}

// ─────────────────────────────────────────────────────────────────────────────
// Local IDs
// ─────────────────────────────────────────────────────────────────────────────

/// Next local ID for a subtask or comment list.
///
/// `max(numeric ids) + 1`; `"1"` when the list is empty or no ID is numeric.
/// The result is sent with the patch, so the stored ID matches it.
#[must_use]
pub fn next_local_id<'a>(ids: impl IntoIterator<Item = &'a str>) -> String {
    ids.into_iter()
        .filter_map(|id| id.trim().parse::<u64>().ok())
        .max()
        .map_or(1, |max| max.saturating_add(1))
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ProjectId, TaskId};
    use chrono::Duration;
    use proptest::prelude::*;

    fn sub(id: &str, completed: bool) -> Subtask {
        Subtask {
            id: id.into(),
            title: format!("sub {id}"),
            completed,
        }
    }

    fn task(status: TaskStatus, due: Option<String>) -> Task {
        Task {
            id: TaskId::new(),
            title: "t".into(),
            description: String::new(),
            project_id: ProjectId::from("p1"),
            status,
            priority: crate::types::TaskPriority::Medium,
            due_date: due,
            tags: vec![],
            subtasks: vec![],
            comments: vec![],
        }
    }

    // ── Status ───────────────────────────────────────────────────────

    #[test]
    fn empty_list_keeps_current_status() {
        assert_eq!(derive_status(&[], TaskStatus::Done), TaskStatus::Done);
        assert_eq!(derive_status(&[], TaskStatus::InProgress), TaskStatus::InProgress);
    }

    #[test]
    fn none_completed_is_todo() {
        let subs = [sub("1", false), sub("2", false)];
        assert_eq!(derive_status(&subs, TaskStatus::Done), TaskStatus::Todo);
    }

    #[test]
    fn partially_completed_is_in_progress() {
        let subs = [sub("1", true), sub("2", true), sub("3", false)];
        assert_eq!(derive_status(&subs, TaskStatus::Todo), TaskStatus::InProgress);
    }

    #[test]
    fn all_completed_is_done() {
        let subs = [sub("1", true)];
        assert_eq!(derive_status(&subs, TaskStatus::Todo), TaskStatus::Done);
    }

    #[test]
    fn manual_done_is_overridden_by_next_derivation() {
        // User set `done` directly while a subtask was still open.
        let manual = TaskStatus::Done;
        let subs = [sub("1", true), sub("2", false)];
        assert_eq!(derive_status(&subs, manual), TaskStatus::InProgress);
    }

    // ── Progress ─────────────────────────────────────────────────────

    #[test]
    fn progress_zero_tasks() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(project_progress(&[]), 0);
    }

    #[test]
    fn progress_rounds() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(3, 3), 100);
    }

    #[test]
    fn project_progress_counts_done_only() {
        let tasks = [
            task(TaskStatus::Done, None),
            task(TaskStatus::InProgress, None),
            task(TaskStatus::Todo, None),
        ];
        assert_eq!(project_progress(&tasks), 33);
    }

    #[test]
    fn project_stats_counts_each_status() {
        let tasks = [
            task(TaskStatus::Done, None),
            task(TaskStatus::Done, None),
            task(TaskStatus::InProgress, None),
            task(TaskStatus::Todo, None),
        ];
        let stats = ProjectStats::from_tasks(&tasks);
        assert_eq!(
            stats,
            ProjectStats {
                total: 4,
                completed: 2,
                in_progress: 1,
                todo: 1
            }
        );
        assert_eq!(stats.progress(), 50);
    }

    // ── Dashboard ────────────────────────────────────────────────────

    #[test]
    fn dashboard_example() {
        let now = Utc::now();
        let yesterday = (now - Duration::days(1)).format("%Y-%m-%d").to_string();
        let tasks = [
            task(TaskStatus::Done, None),
            task(TaskStatus::InProgress, None),
            task(TaskStatus::Todo, Some(yesterday)),
        ];
        let stats = DashboardStats::from_tasks(&tasks, now);
        assert_eq!(
            stats,
            DashboardStats {
                total: 3,
                completed: 1,
                in_progress: 1,
                overdue: 1
            }
        );
    }

    #[test]
    fn done_tasks_never_overdue() {
        let now = Utc::now();
        let t = task(TaskStatus::Done, Some("2000-01-01".into()));
        assert!(!is_overdue(&t, now));
    }

    #[test]
    fn future_and_missing_due_dates_not_overdue() {
        let now = Utc::now();
        let tomorrow = (now + Duration::days(2)).format("%Y-%m-%d").to_string();
        assert!(!is_overdue(&task(TaskStatus::Todo, Some(tomorrow)), now));
        assert!(!is_overdue(&task(TaskStatus::Todo, None), now));
        assert!(!is_overdue(&task(TaskStatus::Todo, Some("soon".into())), now));
    }

    #[test]
    fn empty_dashboard() {
        assert_eq!(DashboardStats::from_tasks(&[], Utc::now()), DashboardStats::default());
    }

    #[test]
    fn parse_due_date_formats() {
        let midnight = parse_due_date("2025-01-02").unwrap();
        assert_eq!(midnight.to_rfc3339(), "2025-01-02T00:00:00+00:00");
        let zoned = parse_due_date("2025-01-02T10:00:00+02:00").unwrap();
        assert_eq!(zoned.to_rfc3339(), "2025-01-02T08:00:00+00:00");
        let naive = parse_due_date("2025-01-02T10:00:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2025-01-02T10:00:00+00:00");
        assert!(parse_due_date("").is_none());
    }

    // ── Local IDs ────────────────────────────────────────────────────

    #[test]
    fn next_id_after_gap() {
        assert_eq!(next_local_id(["1", "3"]), "4");
    }

    #[test]
    fn next_id_empty_list() {
        assert_eq!(next_local_id(std::iter::empty()), "1");
    }

    #[test]
    fn next_id_ignores_non_numeric() {
        assert_eq!(next_local_id(["abc", "2", "x9"]), "3");
        assert_eq!(next_local_id(["abc"]), "1");
    }

    // ── Properties ───────────────────────────────────────────────────

    proptest! {
        #[test]
        fn derived_status_matches_counts(flags in proptest::collection::vec(any::<bool>(), 1..20)) {
            let subs: Vec<Subtask> = flags
                .iter()
                .enumerate()
                .map(|(i, c)| sub(&(i + 1).to_string(), *c))
                .collect();
            let status = derive_status(&subs, TaskStatus::Todo);
            let all = flags.iter().all(|c| *c);
            let none = flags.iter().all(|c| !*c);
            prop_assert_eq!(status == TaskStatus::Done, all);
            prop_assert_eq!(status == TaskStatus::Todo, none);
            prop_assert_eq!(status == TaskStatus::InProgress, !all && !none);
        }

        #[test]
        fn progress_within_bounds(total in 0usize..500, done in 0usize..500) {
            let done = done.min(total);
            let pct = progress_percent(done, total);
            prop_assert!(pct <= 100);
            if total > 0 && done == total {
                prop_assert_eq!(pct, 100);
            }
        }

        #[test]
        fn next_id_exceeds_every_numeric_id(ids in proptest::collection::vec(0u32..10_000, 0..20)) {
            let strings: Vec<String> = ids.iter().map(ToString::to_string).collect();
            let next: u64 = next_local_id(strings.iter().map(String::as_str)).parse().unwrap();
            prop_assert!(ids.iter().all(|id| u64::from(*id) < next));
        }
    }
}
