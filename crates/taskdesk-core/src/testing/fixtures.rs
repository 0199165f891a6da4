//! Seed data written straight to a store, bypassing operation checks.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    NewUser, Priority, Project, ProjectRecord, ProjectStatus, Role, Task, TaskRecord, TaskStatus,
    User,
};
use crate::store::Store;

/// Hash stored for seeded users; it never verifies.
pub const UNUSABLE_HASH: &str = "!";

pub async fn seed_user(store: &dyn Store, first_name: &str, role: Role) -> Result<User> {
    store
        .insert_user(NewUser {
            email: format!("{}@example.com", first_name.to_lowercase()),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            position: "Technician".to_string(),
            role,
            password_hash: UNUSABLE_HASH.to_string(),
        })
        .await
}

pub async fn seed_project(store: &dyn Store, owner_id: Uuid, title: &str) -> Result<Project> {
    let start = Utc::now();
    store
        .insert_project(
            owner_id,
            ProjectRecord {
                title: title.to_string(),
                description: format!("{} project", title),
                status: ProjectStatus::Active,
                priority: Priority::Medium,
                start_date: start,
                end_date: start + Duration::days(30),
                budget: Some(10_000.0),
                tags: vec![],
            },
        )
        .await
}

pub async fn seed_task(
    store: &dyn Store,
    project_id: Uuid,
    status: TaskStatus,
    assignee_ids: Vec<Uuid>,
) -> Result<Task> {
    store
        .insert_task(TaskRecord {
            title: format!("{:?} task", status),
            description: "Seeded".to_string(),
            status,
            priority: Priority::Medium,
            deadline: Utc::now() + Duration::days(7),
            estimated_hours: 2.0,
            actual_hours: None,
            project_id,
            assignee_ids,
        })
        .await
}
