//! Persistence contract.
//!
//! Lookups return `Ok(None)` (or `false` for deletes) when the row is absent;
//! operations turn that into a typed `NotFound`. Writes that touch several
//! rows are atomic. Inserting a user with a taken email yields `Conflict`,
//! and writes referencing a missing parent row yield `NotFound`.

mod memory;

pub use memory::MemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::model::{
    Comment, CommentWithAuthor, InstallationProgress, NewComment, NewTicket, NewUser, Priority,
    ProgressValues, Project, ProjectRecord, Task, TaskFilter, TaskRecord, TaskStatus, Ticket,
    TicketPatch, TicketStatus, TicketType, User, UserPatch,
};

#[async_trait]
pub trait Store: Send + Sync + 'static {
    // Users

    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users ordered by first then last name.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>>;

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>>;

    /// Removes the user's comments and assignments and detaches the user
    /// from projects and tickets.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;

    // Projects

    async fn insert_project(&self, owner_id: Uuid, record: ProjectRecord) -> Result<Project>;

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>>;

    /// Newest first.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn projects_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Project>>;

    async fn update_project(&self, id: Uuid, record: ProjectRecord) -> Result<Option<Project>>;

    /// Removes the project together with its tasks.
    async fn delete_project(&self, id: Uuid) -> Result<bool>;

    // Tasks

    /// Writes the task and its assignee set in one unit.
    async fn insert_task(&self, record: TaskRecord) -> Result<Task>;

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>>;

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>>;

    /// Full replace, including the assignee set.
    async fn update_task(&self, id: Uuid, record: TaskRecord) -> Result<Option<Task>>;

    async fn set_task_status(&self, id: Uuid, status: TaskStatus) -> Result<Option<Task>>;

    /// Removes the task together with its comments and assignments.
    async fn delete_task(&self, id: Uuid) -> Result<bool>;

    /// Assignees keyed by task id. Tasks without assignees are absent.
    async fn assignees_for(&self, task_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<User>>>;

    async fn count_tasks_by_status(&self) -> Result<Vec<(TaskStatus, i64)>>;

    async fn count_tasks_by_priority(&self) -> Result<Vec<(Priority, i64)>>;

    /// Number of assigned tasks per user, for users with at least one.
    async fn assignment_counts(&self) -> Result<Vec<(Uuid, i64)>>;

    // Comments

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Oldest first.
    async fn list_comments(&self, task_id: Uuid) -> Result<Vec<CommentWithAuthor>>;

    // Tickets

    /// Installation tickets get a zeroed progress record in the same unit.
    async fn insert_ticket(
        &self,
        ticket: NewTicket,
    ) -> Result<(Ticket, Option<InstallationProgress>)>;

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>>;

    /// Newest first.
    async fn list_tickets(&self) -> Result<Vec<Ticket>>;

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch) -> Result<Option<Ticket>>;

    /// Removes the ticket together with its progress record.
    async fn delete_ticket(&self, id: Uuid) -> Result<bool>;

    async fn progress_for(
        &self,
        ticket_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, InstallationProgress>>;

    /// `None` when the ticket has no progress record.
    async fn update_progress(
        &self,
        ticket_id: Uuid,
        values: ProgressValues,
    ) -> Result<Option<InstallationProgress>>;

    async fn count_tickets_by_type(&self) -> Result<Vec<(TicketType, i64)>>;

    async fn count_tickets_by_status(&self) -> Result<Vec<(TicketStatus, i64)>>;
}
