//! Dashboard aggregates, folded from grouped counts and raw rows.
//!
//! Everything here is pure and recomputed per request.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::model::{
    Priority, Project, ProjectTask, ProjectTaskCount, Task, TaskStatus, TicketStatus, TicketType,
    User, UserSummary, UserTaskCount,
};

/// Number of users shown on the workload leaderboard.
pub const TOP_ASSIGNEES: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub backlog: i64,
    pub todo: i64,
    pub in_progress: i64,
    pub completed: i64,
}

impl StatusCounts {
    pub fn from_groups(groups: &[(TaskStatus, i64)]) -> Self {
        let mut counts = Self::default();
        for (status, n) in groups {
            match status {
                TaskStatus::Backlog => counts.backlog += n,
                TaskStatus::Todo => counts.todo += n,
                TaskStatus::InProgress => counts.in_progress += n,
                TaskStatus::Completed => counts.completed += n,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
}

impl PriorityCounts {
    pub fn from_groups(groups: &[(Priority, i64)]) -> Self {
        let mut counts = Self::default();
        for (priority, n) in groups {
            match priority {
                Priority::Low => counts.low += n,
                Priority::Medium => counts.medium += n,
                Priority::High => counts.high += n,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub total: i64,
    pub installation: i64,
    pub rectification: i64,
    pub in_progress: i64,
    pub on_hold: i64,
    pub done: i64,
}

impl TicketStats {
    pub fn from_groups(by_type: &[(TicketType, i64)], by_status: &[(TicketStatus, i64)]) -> Self {
        let mut stats = Self::default();
        for (kind, n) in by_type {
            stats.total += n;
            match kind {
                TicketType::Installation => stats.installation += n,
                TicketType::Rectification => stats.rectification += n,
            }
        }
        for (status, n) in by_status {
            match status {
                TicketStatus::InProgress => stats.in_progress += n,
                TicketStatus::OnHold => stats.on_hold += n,
                TicketStatus::Done => stats.done += n,
            }
        }
        stats
    }
}

/// Users ranked by assigned task count (highest first, ties by name), capped
/// at `limit`. Users with no assignments rank with a count of zero.
pub fn top_assignees(users: Vec<User>, counts: &[(Uuid, i64)], limit: usize) -> Vec<UserTaskCount> {
    let counts: HashMap<Uuid, i64> = counts.iter().copied().collect();
    let mut ranked: Vec<UserTaskCount> = users
        .into_iter()
        .map(|user| UserTaskCount {
            task_count: counts.get(&user.id).copied().unwrap_or(0),
            user: UserSummary::from(user),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.task_count
            .cmp(&a.task_count)
            .then_with(|| a.user.first_name.cmp(&b.user.first_name))
            .then_with(|| a.user.last_name.cmp(&b.user.last_name))
            .then_with(|| a.user.id.cmp(&b.user.id))
    });
    ranked.truncate(limit);
    ranked
}

pub fn project_task(task: &Task, assignees: Option<&Vec<User>>) -> ProjectTask {
    ProjectTask {
        id: task.id,
        title: task.title.clone(),
        status: task.status,
        deadline: task.deadline,
        assignees: assignees
            .map(|users| users.iter().map(UserSummary::from).collect())
            .unwrap_or_default(),
    }
}

/// Each project with its tasks ordered by deadline ascending. Project order
/// is preserved.
pub fn project_task_counts(
    projects: Vec<Project>,
    tasks: &[Task],
    assignees: &HashMap<Uuid, Vec<User>>,
) -> Vec<ProjectTaskCount> {
    let mut by_project: HashMap<Uuid, Vec<&Task>> = HashMap::new();
    for task in tasks {
        by_project.entry(task.project_id).or_default().push(task);
    }

    projects
        .into_iter()
        .map(|project| {
            let mut own = by_project.remove(&project.id).unwrap_or_default();
            own.sort_by_key(|t| t.deadline);
            ProjectTaskCount {
                id: project.id,
                title: project.title,
                owner_id: project.owner_id,
                task_count: own.len(),
                tasks: own
                    .into_iter()
                    .map(|t| project_task(t, assignees.get(&t.id)))
                    .collect(),
            }
        })
        .collect()
}
