use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::{DeskError, Result};
use crate::model::{
    AuthorName, Comment, CommentWithAuthor, InstallationProgress, NewComment, NewTicket, NewUser,
    Priority, ProgressValues, Project, ProjectRecord, Task, TaskFilter, TaskOrder, TaskRecord,
    TaskStatus, Ticket, TicketPatch, TicketStatus, TicketType, User, UserPatch,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    tasks: Vec<Task>,
    /// (task_id, user_id)
    assignments: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    tickets: Vec<Ticket>,
    progress: Vec<InstallationProgress>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.id) != except)
    }

    fn require_user(&self, id: Uuid) -> Result<()> {
        match self.user(id) {
            Some(_) => Ok(()),
            None => Err(DeskError::not_found("User", id)),
        }
    }

    fn require_project(&self, id: Uuid) -> Result<()> {
        if self.projects.iter().any(|p| p.id == id) {
            Ok(())
        } else {
            Err(DeskError::not_found("Project", id))
        }
    }

    fn assignee_ids(&self, task_id: Uuid) -> Vec<Uuid> {
        self.assignments
            .iter()
            .filter(|(t, _)| *t == task_id)
            .map(|(_, u)| *u)
            .collect()
    }

    fn set_assignees(&mut self, task_id: Uuid, user_ids: &[Uuid]) -> Result<()> {
        for user_id in user_ids {
            self.require_user(*user_id)?;
        }
        self.assignments.retain(|(t, _)| *t != task_id);
        for user_id in user_ids {
            if !self.assignments.contains(&(task_id, *user_id)) {
                self.assignments.push((task_id, *user_id));
            }
        }
        Ok(())
    }

    fn remove_tasks(&mut self, ids: &[Uuid]) {
        self.tasks.retain(|t| !ids.contains(&t.id));
        self.assignments.retain(|(t, _)| !ids.contains(t));
        self.comments.retain(|c| !ids.contains(&c.task_id));
    }
}

/// In-process store backed by locked vectors. Used by tests and by
/// `taskdesk run --in-memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    accesses: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far.
    pub fn access_count(&self) -> usize {
        self.accesses.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.accesses.fetch_add(1, Ordering::SeqCst);
    }
}

fn newest_first<T: Clone>(rows: &[T], created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.iter().rev().cloned().collect();
    rows.sort_by_key(|r| std::cmp::Reverse(created(r)));
    rows
}

fn tally<K: Copy + Eq + Hash>(keys: impl Iterator<Item = K>) -> Vec<(K, i64)> {
    let mut counts: HashMap<K, i64> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts.into_iter().collect()
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        self.touch();
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(DeskError::Conflict("User already exists".into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            position: user.position,
            role: user.role,
            image: None,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.touch();
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.touch();
        let mut users = self.tables.read().await.users.clone();
        users.sort_by(|a, b| {
            (a.first_name.as_str(), a.last_name.as_str())
                .cmp(&(b.first_name.as_str(), b.last_name.as_str()))
        });
        Ok(users)
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| (u.id, u.clone()))
            .collect())
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>> {
        self.touch();
        let mut tables = self.tables.write().await;
        if let Some(email) = &patch.email {
            if tables.email_taken(email, Some(id)) {
                return Err(DeskError::Conflict("User already exists".into()));
            }
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(position) = patch.position {
            user.position = position;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(password_hash) = patch.password_hash {
            user.password_hash = password_hash;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.touch();
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }

        tables.comments.retain(|c| c.user_id != id);
        tables.assignments.retain(|(_, u)| *u != id);
        for project in tables.projects.iter_mut().filter(|p| p.owner_id == Some(id)) {
            project.owner_id = None;
        }
        for ticket in tables.tickets.iter_mut().filter(|t| t.user_id == Some(id)) {
            ticket.user_id = None;
        }
        Ok(true)
    }

    async fn insert_project(&self, owner_id: Uuid, record: ProjectRecord) -> Result<Project> {
        self.touch();
        let mut tables = self.tables.write().await;
        tables.require_user(owner_id)?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: record.title,
            description: record.description,
            status: record.status,
            priority: record.priority,
            start_date: record.start_date,
            end_date: record.end_date,
            budget: record.budget,
            tags: record.tags,
            owner_id: Some(owner_id),
            created_at: now,
            updated_at: now,
        };
        tables.projects.push(project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.projects, |p| p.created_at))
    }

    async fn projects_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Project>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .iter()
            .filter(|p| ids.contains(&p.id))
            .map(|p| (p.id, p.clone()))
            .collect())
    }

    async fn update_project(&self, id: Uuid, record: ProjectRecord) -> Result<Option<Project>> {
        self.touch();
        let mut tables = self.tables.write().await;
        let Some(project) = tables.projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        project.title = record.title;
        project.description = record.description;
        project.status = record.status;
        project.priority = record.priority;
        project.start_date = record.start_date;
        project.end_date = record.end_date;
        project.budget = record.budget;
        project.tags = record.tags;
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool> {
        self.touch();
        let mut tables = self.tables.write().await;
        let before = tables.projects.len();
        tables.projects.retain(|p| p.id != id);
        if tables.projects.len() == before {
            return Ok(false);
        }

        let task_ids: Vec<Uuid> = tables
            .tasks
            .iter()
            .filter(|t| t.project_id == id)
            .map(|t| t.id)
            .collect();
        tables.remove_tasks(&task_ids);
        Ok(true)
    }

    async fn insert_task(&self, record: TaskRecord) -> Result<Task> {
        self.touch();
        let mut tables = self.tables.write().await;
        tables.require_project(record.project_id)?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: record.title,
            description: record.description,
            status: record.status,
            priority: record.priority,
            deadline: record.deadline,
            estimated_hours: record.estimated_hours,
            actual_hours: record.actual_hours,
            project_id: record.project_id,
            created_at: now,
            updated_at: now,
        };
        tables.set_assignees(task.id, &record.assignee_ids)?;
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = newest_first(&tables.tasks, |t| t.created_at)
            .into_iter()
            .filter(|t| filter.matches(t, &tables.assignee_ids(t.id)))
            .collect();
        if filter.order == TaskOrder::DeadlineAsc {
            tasks.sort_by_key(|t| t.deadline);
        }
        if let Some(limit) = filter.limit {
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, record: TaskRecord) -> Result<Option<Task>> {
        self.touch();
        let mut tables = self.tables.write().await;
        if !tables.tasks.iter().any(|t| t.id == id) {
            return Ok(None);
        }
        tables.require_project(record.project_id)?;
        tables.set_assignees(id, &record.assignee_ids)?;

        let Some(task) = tables.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.title = record.title;
        task.description = record.description;
        task.status = record.status;
        task.priority = record.priority;
        task.deadline = record.deadline;
        task.estimated_hours = record.estimated_hours;
        task.actual_hours = record.actual_hours;
        task.project_id = record.project_id;
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn set_task_status(&self, id: Uuid, status: TaskStatus) -> Result<Option<Task>> {
        self.touch();
        let mut tables = self.tables.write().await;
        Ok(tables.tasks.iter_mut().find(|t| t.id == id).map(|task| {
            task.status = status;
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        self.touch();
        let mut tables = self.tables.write().await;
        if !tables.tasks.iter().any(|t| t.id == id) {
            return Ok(false);
        }
        tables.remove_tasks(&[id]);
        Ok(true)
    }

    async fn assignees_for(&self, task_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<User>>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut out: HashMap<Uuid, Vec<User>> = HashMap::new();
        for (task_id, user_id) in &tables.assignments {
            if !task_ids.contains(task_id) {
                continue;
            }
            if let Some(user) = tables.user(*user_id) {
                out.entry(*task_id).or_default().push(user.clone());
            }
        }
        Ok(out)
    }

    async fn count_tasks_by_status(&self) -> Result<Vec<(TaskStatus, i64)>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tally(tables.tasks.iter().map(|t| t.status)))
    }

    async fn count_tasks_by_priority(&self) -> Result<Vec<(Priority, i64)>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tally(tables.tasks.iter().map(|t| t.priority)))
    }

    async fn assignment_counts(&self) -> Result<Vec<(Uuid, i64)>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tally(tables.assignments.iter().map(|(_, u)| *u)))
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        self.touch();
        let mut tables = self.tables.write().await;
        if !tables.tasks.iter().any(|t| t.id == comment.task_id) {
            return Err(DeskError::not_found("Task", comment.task_id));
        }
        tables.require_user(comment.user_id)?;

        let comment = Comment {
            id: Uuid::new_v4(),
            text: comment.text,
            task_id: comment.task_id,
            user_id: comment.user_id,
            created_at: Utc::now(),
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        self.touch();
        let tables = self.tables.read().await;
        let mut comments: Vec<CommentWithAuthor> = tables
            .comments
            .iter()
            .filter(|c| c.task_id == task_id)
            .filter_map(|c| {
                tables.user(c.user_id).map(|u| CommentWithAuthor {
                    comment: c.clone(),
                    user: AuthorName {
                        first_name: u.first_name.clone(),
                        last_name: u.last_name.clone(),
                    },
                })
            })
            .collect();
        comments.sort_by_key(|c| c.comment.created_at);
        Ok(comments)
    }

    async fn insert_ticket(
        &self,
        ticket: NewTicket,
    ) -> Result<(Ticket, Option<InstallationProgress>)> {
        self.touch();
        let mut tables = self.tables.write().await;
        if let Some(user_id) = ticket.user_id {
            tables.require_user(user_id)?;
        }

        let now = Utc::now();
        let ticket = Ticket {
            id: Uuid::new_v4(),
            kind: ticket.kind,
            status: TicketStatus::default(),
            activity_type: ticket.activity_type,
            remarks: ticket.remarks,
            user_id: ticket.user_id,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        let progress = (ticket.kind == TicketType::Installation).then(|| InstallationProgress {
            id: Uuid::new_v4(),
            ticket_id: ticket.id,
            pole_excavation: 0,
            cable_laid: 0,
            nap_lcp_mounted: 0,
            pole_erected: 0,
            cable_fixed: 0,
            nap_lcp_spliced: 0,
            updated_at: now,
        });

        tables.tickets.push(ticket.clone());
        if let Some(progress) = &progress {
            tables.progress.push(progress.clone());
        }
        Ok((ticket, progress))
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(newest_first(&tables.tickets, |t| t.created_at))
    }

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch) -> Result<Option<Ticket>> {
        self.touch();
        let mut tables = self.tables.write().await;
        if let Some(user_id) = patch.user_id {
            tables.require_user(user_id)?;
        }

        let Some(ticket) = tables.tickets.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(activity_type) = patch.activity_type {
            ticket.activity_type = Some(activity_type);
        }
        if let Some(remarks) = patch.remarks {
            ticket.remarks = Some(remarks);
        }
        if let Some(user_id) = patch.user_id {
            ticket.user_id = Some(user_id);
        }
        if let Some(completed_at) = patch.completed_at {
            ticket.completed_at = Some(completed_at);
        }
        ticket.updated_at = Utc::now();
        Ok(Some(ticket.clone()))
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool> {
        self.touch();
        let mut tables = self.tables.write().await;
        let before = tables.tickets.len();
        tables.tickets.retain(|t| t.id != id);
        if tables.tickets.len() == before {
            return Ok(false);
        }
        tables.progress.retain(|p| p.ticket_id != id);
        Ok(true)
    }

    async fn progress_for(
        &self,
        ticket_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, InstallationProgress>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tables
            .progress
            .iter()
            .filter(|p| ticket_ids.contains(&p.ticket_id))
            .map(|p| (p.ticket_id, p.clone()))
            .collect())
    }

    async fn update_progress(
        &self,
        ticket_id: Uuid,
        values: ProgressValues,
    ) -> Result<Option<InstallationProgress>> {
        self.touch();
        let mut tables = self.tables.write().await;
        Ok(tables
            .progress
            .iter_mut()
            .find(|p| p.ticket_id == ticket_id)
            .map(|progress| {
                progress.pole_excavation = values.pole_excavation;
                progress.cable_laid = values.cable_laid;
                progress.nap_lcp_mounted = values.nap_lcp_mounted;
                progress.pole_erected = values.pole_erected;
                progress.cable_fixed = values.cable_fixed;
                progress.nap_lcp_spliced = values.nap_lcp_spliced;
                progress.updated_at = Utc::now();
                progress.clone()
            }))
    }

    async fn count_tickets_by_type(&self) -> Result<Vec<(TicketType, i64)>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tally(tables.tickets.iter().map(|t| t.kind)))
    }

    async fn count_tickets_by_status(&self) -> Result<Vec<(TicketStatus, i64)>> {
        self.touch();
        let tables = self.tables.read().await;
        Ok(tally(tables.tickets.iter().map(|t| t.status)))
    }
}
