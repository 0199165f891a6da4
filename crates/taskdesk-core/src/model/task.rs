use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{Priority, TaskStatus};
use super::project::ProjectRef;
use super::user::UserSummary;

/// A task row.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub deadline: DateTime<Utc>,
    pub estimated_hours: f64,
    pub actual_hours: Option<f64>,
    pub project_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated, full set of task fields including the assignee set.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub deadline: DateTime<Utc>,
    pub estimated_hours: f64,
    pub actual_hours: Option<f64>,
    pub project_id: Uuid,
    pub assignee_ids: Vec<Uuid>,
}

/// A task with its assignees and parent project.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub assignees: Vec<UserSummary>,
    pub project: Option<ProjectRef>,
}

/// Ordering for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskOrder {
    /// Newest `created_at` first.
    #[default]
    NewestFirst,
    /// Earliest deadline first.
    DeadlineAsc,
}

/// Filter for task listings. Empty filter matches every task.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub statuses: Option<Vec<TaskStatus>>,
    pub limit: Option<usize>,
    pub order: TaskOrder,
}

impl TaskFilter {
    /// Whether a task row (with its assignee ids) passes this filter, ignoring limit.
    pub fn matches(&self, task: &Task, assignees: &[Uuid]) -> bool {
        if let Some(project_id) = self.project_id {
            if task.project_id != project_id {
                return false;
            }
        }
        if let Some(assignee_id) = self.assignee_id {
            if !assignees.contains(&assignee_id) {
                return false;
            }
        }
        match &self.statuses {
            Some(statuses) => statuses.contains(&task.status),
            None => true,
        }
    }
}
