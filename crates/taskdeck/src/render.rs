//! Plain-text rendering of the views.

use std::fmt::Write;

use taskdeck_core::{Project, Task, TaskStatus};
use taskdeck_sync::{Dashboard, ProjectOverview, TaskDetail};

fn checkbox(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

fn task_line(out: &mut String, task: &Task) {
    let _ = writeln!(
        out,
        "{} {:<40} {:<12} project #{}  ({})",
        checkbox(task.status == TaskStatus::Done),
        task.title,
        task.status,
        task.project_id,
        task.id
    );
}

/// Dashboard counters and recent tasks.
pub fn dashboard(view: &Dashboard) -> String {
    let mut out = String::new();
    let stats = &view.stats;
    let _ = writeln!(out, "Total Tasks   {}", stats.total);
    let _ = writeln!(out, "Completed     {}", stats.completed);
    let _ = writeln!(out, "In Progress   {}", stats.in_progress);
    let _ = writeln!(out, "Overdue       {}", stats.overdue);
    let _ = writeln!(out);
    let _ = writeln!(out, "Recent Tasks");
    for task in &view.recent {
        task_line(&mut out, task);
    }
    out
}

/// One line per task.
pub fn task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks found\n".to_string();
    }
    let mut out = String::new();
    for task in tasks {
        task_line(&mut out, task);
    }
    out
}

/// Full task page.
pub fn task_detail(view: &TaskDetail) -> String {
    let task = &view.task;
    let mut out = String::new();
    let _ = writeln!(out, "{}  ({})", task.title, task.id);
    let _ = writeln!(out, "Status: {}   Priority: {}", task.status, task.priority);
    if let Some(due) = &task.due_date {
        let _ = writeln!(out, "Due: {due}");
    }
    if !task.tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", task.tags.join(", "));
    }
    if !task.description.is_empty() {
        let _ = writeln!(out, "\n{}", task.description);
    }
    let _ = writeln!(out, "\nSubtasks ({})", view.subtask_summary());
    for subtask in &task.subtasks {
        let _ = writeln!(
            out,
            "  {} {}  #{}",
            checkbox(subtask.completed),
            subtask.title,
            subtask.id
        );
    }
    let _ = writeln!(out, "\nComments ({})", task.comments.len());
    for comment in &task.comments {
        let _ = writeln!(out, "  {} ({}): {}", comment.author, comment.created_at, comment.content);
    }
    out
}

/// Project list.
pub fn projects(projects: &[Project]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} active projects", projects.len());
    for project in projects {
        let _ = writeln!(
            out,
            "  {}  {}  ({})",
            project.name,
            project.description.as_deref().unwrap_or("No description"),
            project.id
        );
    }
    out
}

/// Project page with progress.
pub fn project_overview(view: &ProjectOverview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}  ({})", view.project.name, view.project.id);
    if let Some(description) = &view.project.description {
        let _ = writeln!(out, "{description}");
    }
    let stats = &view.stats;
    let _ = writeln!(
        out,
        "Progress {}%  ({} done, {} in progress, {} to do)",
        view.progress, stats.completed, stats.in_progress, stats.todo
    );
    let _ = writeln!(out);
    out.push_str(&task_list(&view.tasks));
    out
}
