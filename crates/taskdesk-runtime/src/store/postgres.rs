use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres};
use uuid::Uuid;

use taskdesk_core::error::{DeskError, Result};
use taskdesk_core::model::{
    AuthorName, Comment, CommentWithAuthor, InstallationProgress, NewComment, NewTicket, NewUser,
    Priority, ProgressValues, Project, ProjectRecord, Task, TaskFilter, TaskOrder, TaskRecord,
    TaskStatus, Ticket, TicketPatch, TicketStatus, TicketType, User, UserPatch,
};
use taskdesk_core::store::Store;

/// PostgreSQL implementation of [`Store`]. Cascades and `SET NULL` rules live
/// in the schema; multi-row writes run in a transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct AssigneeRow {
    task_id: Uuid,
    #[sqlx(flatten)]
    user: User,
}

#[derive(FromRow)]
struct CommentRow {
    #[sqlx(flatten)]
    comment: Comment,
    first_name: String,
    last_name: String,
}

/// Map constraint violations on writes to domain errors.
fn write_err(e: sqlx::Error) -> DeskError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return DeskError::Conflict(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            let entity = match db.constraint() {
                Some(c) if c.contains("project_id") => "project",
                Some(c) if c.contains("ticket_id") => "ticket",
                Some(c) if c.contains("task_id") => "task",
                _ => "user",
            };
            return DeskError::NotFound(format!("Referenced {} does not exist", entity));
        }
    }
    DeskError::Sql(e)
}

fn user_write_err(e: sqlx::Error) -> DeskError {
    match write_err(e) {
        DeskError::Conflict(_) => DeskError::Conflict("User already exists".into()),
        other => other,
    }
}

async fn insert_assignees(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    task_id: Uuid,
    user_ids: &[Uuid],
) -> Result<()> {
    if user_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        INSERT INTO task_assignees (task_id, user_id)
        SELECT $1, UNNEST($2::uuid[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(task_id)
    .bind(user_ids)
    .execute(&mut **tx)
    .await
    .map_err(write_err)?;
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, first_name, last_name, position, role, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.position)
        .bind(user.role)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(user_write_err)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(
            sqlx::query_as("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        Ok(
            sqlx::query_as("SELECT * FROM users ORDER BY first_name, last_name, id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users: Vec<User> = sqlx::query_as("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    async fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                position = COALESCE($5, position),
                role = COALESCE($6, role),
                password_hash = COALESCE($7, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.email)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.position)
        .bind(patch.role)
        .bind(patch.password_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(user_write_err)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_project(&self, owner_id: Uuid, record: ProjectRecord) -> Result<Project> {
        sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                id, title, description, status, priority, start_date, end_date,
                budget, tags, owner_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.status)
        .bind(record.priority)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.budget)
        .bind(&record.tags)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn get_project(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(sqlx::query_as("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Ok(
            sqlx::query_as("SELECT * FROM projects ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn projects_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Project>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let projects: Vec<Project> = sqlx::query_as("SELECT * FROM projects WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(projects.into_iter().map(|p| (p.id, p)).collect())
    }

    async fn update_project(&self, id: Uuid, record: ProjectRecord) -> Result<Option<Project>> {
        sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects SET
                title = $2,
                description = $3,
                status = $4,
                priority = $5,
                start_date = $6,
                end_date = $7,
                budget = $8,
                tags = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.status)
        .bind(record.priority)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(record.budget)
        .bind(&record.tags)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_task(&self, record: TaskRecord) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                id, title, description, status, priority, deadline,
                estimated_hours, actual_hours, project_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.status)
        .bind(record.priority)
        .bind(record.deadline)
        .bind(record.estimated_hours)
        .bind(record.actual_hours)
        .bind(record.project_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_err)?;

        insert_assignees(&mut tx, task.id, &record.assignee_ids).await?;
        tx.commit().await?;
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let limit = filter.limit.map(|n| n as i64);
        let by_deadline = filter.order == TaskOrder::DeadlineAsc;

        Ok(sqlx::query_as(
            r#"
            SELECT t.* FROM tasks t
            WHERE ($1::UUID IS NULL OR t.project_id = $1)
              AND ($2::UUID IS NULL OR EXISTS (
                    SELECT 1 FROM task_assignees a WHERE a.task_id = t.id AND a.user_id = $2))
              AND ($3::task_status[] IS NULL OR t.status = ANY($3))
            ORDER BY CASE WHEN $4::BOOLEAN THEN t.deadline END ASC, t.created_at DESC
            LIMIT $5
            "#,
        )
        .bind(filter.project_id)
        .bind(filter.assignee_id)
        .bind(filter.statuses.as_deref())
        .bind(by_deadline)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_task(&self, id: Uuid, record: TaskRecord) -> Result<Option<Task>> {
        let mut tx = self.pool.begin().await?;
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks SET
                title = $2,
                description = $3,
                status = $4,
                priority = $5,
                deadline = $6,
                estimated_hours = $7,
                actual_hours = $8,
                project_id = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.status)
        .bind(record.priority)
        .bind(record.deadline)
        .bind(record.estimated_hours)
        .bind(record.actual_hours)
        .bind(record.project_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(write_err)?;

        let Some(task) = task else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM task_assignees WHERE task_id = $1")
            .bind(task.id)
            .execute(&mut *tx)
            .await?;
        insert_assignees(&mut tx, task.id, &record.assignee_ids).await?;
        tx.commit().await?;
        Ok(Some(task))
    }

    async fn set_task_status(&self, id: Uuid, status: TaskStatus) -> Result<Option<Task>> {
        Ok(sqlx::query_as(
            "UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn assignees_for(&self, task_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<User>>> {
        if task_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<AssigneeRow> = sqlx::query_as(
            r#"
            SELECT a.task_id, u.*
            FROM task_assignees a
            JOIN users u ON u.id = a.user_id
            WHERE a.task_id = ANY($1)
            ORDER BY u.first_name, u.last_name
            "#,
        )
        .bind(task_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut out: HashMap<Uuid, Vec<User>> = HashMap::new();
        for row in rows {
            out.entry(row.task_id).or_default().push(row.user);
        }
        Ok(out)
    }

    async fn count_tasks_by_status(&self) -> Result<Vec<(TaskStatus, i64)>> {
        Ok(
            sqlx::query_as("SELECT status, COUNT(*) FROM tasks GROUP BY status")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn count_tasks_by_priority(&self) -> Result<Vec<(Priority, i64)>> {
        Ok(
            sqlx::query_as("SELECT priority, COUNT(*) FROM tasks GROUP BY priority")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn assignment_counts(&self) -> Result<Vec<(Uuid, i64)>> {
        Ok(
            sqlx::query_as("SELECT user_id, COUNT(*) FROM task_assignees GROUP BY user_id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_comment(&self, comment: NewComment) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, text, task_id, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&comment.text)
        .bind(comment.task_id)
        .bind(comment.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn list_comments(&self, task_id: Uuid) -> Result<Vec<CommentWithAuthor>> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            r#"
            SELECT c.*, u.first_name, u.last_name
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.task_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CommentWithAuthor {
                comment: row.comment,
                user: AuthorName {
                    first_name: row.first_name,
                    last_name: row.last_name,
                },
            })
            .collect())
    }

    async fn insert_ticket(
        &self,
        ticket: NewTicket,
    ) -> Result<(Ticket, Option<InstallationProgress>)> {
        let mut tx = self.pool.begin().await?;
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (id, type, activity_type, remarks, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(ticket.kind)
        .bind(&ticket.activity_type)
        .bind(&ticket.remarks)
        .bind(ticket.user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(write_err)?;

        let progress = if ticket.kind == TicketType::Installation {
            let progress = sqlx::query_as::<_, InstallationProgress>(
                "INSERT INTO installation_progress (id, ticket_id) VALUES ($1, $2) RETURNING *",
            )
            .bind(Uuid::new_v4())
            .bind(ticket.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(write_err)?;
            Some(progress)
        } else {
            None
        };

        tx.commit().await?;
        Ok((ticket, progress))
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<Ticket>> {
        Ok(sqlx::query_as("SELECT * FROM tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        Ok(
            sqlx::query_as("SELECT * FROM tickets ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn update_ticket(&self, id: Uuid, patch: TicketPatch) -> Result<Option<Ticket>> {
        sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets SET
                status = COALESCE($2, status),
                activity_type = COALESCE($3, activity_type),
                remarks = COALESCE($4, remarks),
                user_id = COALESCE($5, user_id),
                completed_at = COALESCE($6, completed_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch.status)
        .bind(patch.activity_type)
        .bind(patch.remarks)
        .bind(patch.user_id)
        .bind(patch.completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn delete_ticket(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tickets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn progress_for(
        &self,
        ticket_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, InstallationProgress>> {
        if ticket_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<InstallationProgress> =
            sqlx::query_as("SELECT * FROM installation_progress WHERE ticket_id = ANY($1)")
                .bind(ticket_ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|p| (p.ticket_id, p)).collect())
    }

    async fn update_progress(
        &self,
        ticket_id: Uuid,
        values: ProgressValues,
    ) -> Result<Option<InstallationProgress>> {
        sqlx::query_as::<_, InstallationProgress>(
            r#"
            UPDATE installation_progress SET
                pole_excavation = $2,
                cable_laid = $3,
                nap_lcp_mounted = $4,
                pole_erected = $5,
                cable_fixed = $6,
                nap_lcp_spliced = $7,
                updated_at = NOW()
            WHERE ticket_id = $1
            RETURNING *
            "#,
        )
        .bind(ticket_id)
        .bind(values.pole_excavation)
        .bind(values.cable_laid)
        .bind(values.nap_lcp_mounted)
        .bind(values.pole_erected)
        .bind(values.cable_fixed)
        .bind(values.nap_lcp_spliced)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)
    }

    async fn count_tickets_by_type(&self) -> Result<Vec<(TicketType, i64)>> {
        Ok(
            sqlx::query_as("SELECT type, COUNT(*) FROM tickets GROUP BY type")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn count_tickets_by_status(&self) -> Result<Vec<(TicketStatus, i64)>> {
        Ok(
            sqlx::query_as("SELECT status, COUNT(*) FROM tickets GROUP BY status")
                .fetch_all(&self.pool)
                .await?,
        )
    }
}
