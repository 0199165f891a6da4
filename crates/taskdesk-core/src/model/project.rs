use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{Priority, ProjectStatus, TaskStatus};
use super::user::UserSummary;

/// A project grouping tasks.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    pub tags: Vec<String>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Drop fields the caller is not allowed to see.
    pub fn redacted(mut self, show_budget: bool) -> Self {
        if !show_budget {
            self.budget = None;
        }
        self
    }
}

/// Validated, full set of editable project fields.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub budget: Option<f64>,
    pub tags: Vec<String>,
}

/// Minimal reference to a project embedded in task payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: Uuid,
    pub title: String,
}

impl From<&Project> for ProjectRef {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            title: project.title.clone(),
        }
    }
}

/// Task line shown inside project views.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTask {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<UserSummary>,
}

/// A project with its tasks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<ProjectTask>,
}

/// Dashboard row: a project, its task count and tasks ordered by deadline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTaskCount {
    pub id: Uuid,
    pub title: String,
    pub owner_id: Option<Uuid>,
    pub task_count: usize,
    pub tasks: Vec<ProjectTask>,
}
