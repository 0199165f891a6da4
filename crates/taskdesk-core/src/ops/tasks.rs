use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{created, ok, ById, Deleted, NoArgs, Reply};
use crate::error::{DeskError, Result};
use crate::function::{DeskMutation, DeskQuery, FunctionInfo, MutationContext, QueryContext};
use crate::model::{
    Comment, CommentWithAuthor, NewComment, Priority, ProjectRef, Task, TaskDetail, TaskFilter,
    TaskRecord, TaskStatus, UserSummary,
};
use crate::stats::{PriorityCounts, StatusCounts};
use crate::store::Store;
use crate::validate::{dedup_ids, Violations};

/// How many tasks the recent-activity feed shows.
pub const RECENT_TASKS: usize = 5;

/// Task fields as submitted by a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub deadline: String,
    pub estimated_hours: f64,
    #[serde(default)]
    pub actual_hours: Option<f64>,
    pub project_id: Uuid,
    #[serde(default)]
    pub assignee_ids: Vec<Uuid>,
}

impl TaskInput {
    /// Validate fields and references, producing the record to store.
    async fn into_record(self, store: &dyn Store) -> Result<TaskRecord> {
        let mut v = Violations::new();
        v.non_empty("title", &self.title)
            .non_empty("description", &self.description)
            .non_negative("estimatedHours", self.estimated_hours);
        if let Some(actual) = self.actual_hours {
            v.non_negative("actualHours", actual);
        }
        let deadline = v.date("deadline", &self.deadline);
        v.finish()?;
        let deadline = deadline.ok_or_else(|| DeskError::Validation("deadline: missing".into()))?;

        if store.get_project(self.project_id).await?.is_none() {
            return Err(DeskError::not_found("Project", self.project_id));
        }
        let assignee_ids = dedup_ids(self.assignee_ids);
        let found = store.users_by_ids(&assignee_ids).await?;
        if let Some(missing) = assignee_ids.iter().find(|id| !found.contains_key(*id)) {
            return Err(DeskError::not_found("User", missing));
        }

        Ok(TaskRecord {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            status: self.status,
            priority: self.priority,
            deadline,
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            project_id: self.project_id,
            assignee_ids,
        })
    }
}

/// Attach assignees and project references to task rows, keeping their order.
pub async fn task_details(store: &dyn Store, tasks: Vec<Task>) -> Result<Vec<TaskDetail>> {
    let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let mut project_ids: Vec<Uuid> = tasks.iter().map(|t| t.project_id).collect();
    project_ids.sort();
    project_ids.dedup();

    let mut assignees = store.assignees_for(&task_ids).await?;
    let projects = store.projects_by_ids(&project_ids).await?;

    Ok(tasks
        .into_iter()
        .map(|task| TaskDetail {
            assignees: assignees
                .remove(&task.id)
                .unwrap_or_default()
                .into_iter()
                .map(UserSummary::from)
                .collect(),
            project: projects.get(&task.project_id).map(ProjectRef::from),
            task,
        })
        .collect())
}

async fn task_detail(store: &dyn Store, task: Task) -> Result<TaskDetail> {
    let mut details = task_details(store, vec![task]).await?;
    details
        .pop()
        .ok_or_else(|| DeskError::Internal("task detail lost".into()))
}

pub struct CreateTask;

impl DeskMutation for CreateTask {
    type Args = TaskInput;
    type Output = Reply<TaskDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("create_task").describe("Create a task with its assignees")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let record = args.into_record(ctx.store()).await?;
            let task = ctx.store().insert_task(record).await?;
            info!(task_id = %task.id, project_id = %task.project_id, "Task created");

            let detail = task_detail(ctx.store(), task).await?;
            created("Task successfully created", detail)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditTaskInput {
    pub id: Uuid,
    #[serde(flatten)]
    pub task: TaskInput,
}

pub struct EditTask;

impl DeskMutation for EditTask {
    type Args = EditTaskInput;
    type Output = Reply<TaskDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("edit_task").describe("Replace a task's fields and assignee set")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let store = ctx.store();
            if store.get_task(args.id).await?.is_none() {
                return Err(DeskError::not_found("Task", args.id));
            }
            let record = args.task.into_record(store).await?;
            let task = store
                .update_task(args.id, record)
                .await?
                .ok_or_else(|| DeskError::not_found("Task", args.id))?;
            info!(task_id = %task.id, "Task updated");

            let detail = task_detail(store, task).await?;
            ok("Task successfully updated", detail)
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub status: TaskStatus,
}

pub struct UpdateTaskStatus;

impl DeskMutation for UpdateTaskStatus {
    type Args = StatusChange;
    type Output = Reply<Task>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("update_task_status").describe("Move a task to another status")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let task = ctx
                .store()
                .set_task_status(args.id, args.status)
                .await?
                .ok_or_else(|| DeskError::not_found("Task", args.id))?;
            info!(task_id = %task.id, status = ?task.status, "Task status changed");
            ok("Task status updated", task)
        })
    }
}

pub struct DeleteTask;

impl DeskMutation for DeleteTask {
    type Args = ById;
    type Output = Reply<Deleted>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("delete_task").describe("Delete a task and its comments")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            if !ctx.store().delete_task(args.id).await? {
                return Err(DeskError::not_found("Task", args.id));
            }
            info!(task_id = %args.id, "Task deleted");
            ok("Task successfully deleted", Deleted { id: args.id })
        })
    }
}

pub struct GetTask;

impl DeskQuery for GetTask {
    type Args = ById;
    type Output = Reply<TaskDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("get_task")
    }

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let task = ctx
                .store()
                .get_task(args.id)
                .await?
                .ok_or_else(|| DeskError::not_found("Task", args.id))?;
            let detail = task_detail(ctx.store(), task).await?;
            ok("Task found", detail)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksArgs {
    #[serde(default)]
    pub project_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub assignee_id: Option<Uuid>,
}

pub struct ListTasks;

impl DeskQuery for ListTasks {
    type Args = ListTasksArgs;
    type Output = Reply<Vec<TaskDetail>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_tasks").describe("All tasks, newest first")
    }

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let filter = TaskFilter {
                project_id: args.project_id,
                assignee_id: args.assignee_id,
                statuses: args.status.map(|s| vec![s]),
                ..Default::default()
            };
            let tasks = ctx.store().list_tasks(&filter).await?;
            let details = task_details(ctx.store(), tasks).await?;
            ok("Tasks retrieved", details)
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentTasksArgs {
    /// Restrict the feed to these statuses. Absent means every status.
    #[serde(default)]
    pub statuses: Option<Vec<TaskStatus>>,
}

pub struct ListRecentTasks;

impl DeskQuery for ListRecentTasks {
    type Args = RecentTasksArgs;
    type Output = Reply<Vec<TaskDetail>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_recent_tasks").describe("The five most recently created tasks")
    }

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let filter = TaskFilter {
                statuses: args.statuses,
                limit: Some(RECENT_TASKS),
                ..Default::default()
            };
            let tasks = ctx.store().list_tasks(&filter).await?;
            let details = task_details(ctx.store(), tasks).await?;
            ok("Recent tasks retrieved", details)
        })
    }
}

pub struct GetTaskStatusCounts;

impl DeskQuery for GetTaskStatusCounts {
    type Args = NoArgs;
    type Output = Reply<StatusCounts>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("get_task_status_counts")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let groups = ctx.store().count_tasks_by_status().await?;
            ok("Task status counts", StatusCounts::from_groups(&groups))
        })
    }
}

pub struct GetTaskPriorityCounts;

impl DeskQuery for GetTaskPriorityCounts {
    type Args = NoArgs;
    type Output = Reply<PriorityCounts>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("get_task_priority_counts")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let groups = ctx.store().count_tasks_by_priority().await?;
            ok(
                "Task priority counts",
                PriorityCounts::from_groups(&groups),
            )
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInput {
    pub task_id: Uuid,
    pub text: String,
}

pub struct AddComment;

impl DeskMutation for AddComment {
    type Args = CommentInput;
    type Output = Reply<Comment>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("add_comment").describe("Comment on a task as the caller")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            let user_id = ctx.require_user_id()?;
            let mut v = Violations::new();
            v.non_empty("text", &args.text);
            v.finish()?;

            if ctx.store().get_task(args.task_id).await?.is_none() {
                return Err(DeskError::not_found("Task", args.task_id));
            }
            let comment = ctx
                .store()
                .insert_comment(NewComment {
                    text: args.text.trim().to_string(),
                    task_id: args.task_id,
                    user_id,
                })
                .await?;
            info!(task_id = %comment.task_id, comment_id = %comment.id, "Comment added");
            created("Comment added", comment)
        })
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByTask {
    pub task_id: Uuid,
}

pub struct ListComments;

impl DeskQuery for ListComments {
    type Args = ByTask;
    type Output = Reply<Vec<CommentWithAuthor>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_comments").describe("Comments of a task, oldest first")
    }

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            if ctx.store().get_task(args.task_id).await?.is_none() {
                return Err(DeskError::not_found("Task", args.task_id));
            }
            let comments = ctx.store().list_comments(args.task_id).await?;
            ok("Comments retrieved", comments)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Role;
    use crate::store::MemoryStore;
    use crate::testing::{seed_project, seed_task, seed_user, TestContext};
    use crate::{assert_err_variant, assert_ok};

    struct World {
        ctx: TestContext,
        project_id: Uuid,
        alice: Uuid,
        bob: Uuid,
        carol: Uuid,
    }

    async fn world() -> World {
        let store = Arc::new(MemoryStore::new());
        let alice = seed_user(store.as_ref(), "Alice", Role::Admin).await.unwrap();
        let bob = seed_user(store.as_ref(), "Bob", Role::User).await.unwrap();
        let carol = seed_user(store.as_ref(), "Carol", Role::User).await.unwrap();
        let project = seed_project(store.as_ref(), alice.id, "Backbone").await.unwrap();
        World {
            ctx: TestContext::new(store).as_user(bob.id).with_role("USER"),
            project_id: project.id,
            alice: alice.id,
            bob: bob.id,
            carol: carol.id,
        }
    }

    fn input(project_id: Uuid, assignees: Vec<Uuid>) -> TaskInput {
        TaskInput {
            title: "Splice closure 14".into(),
            description: "Re-splice after storm damage".into(),
            status: TaskStatus::InProgress,
            priority: Priority::High,
            deadline: "2030-01-15".into(),
            estimated_hours: 3.5,
            actual_hours: None,
            project_id,
            assignee_ids: assignees,
        }
    }

    fn ids(detail: &TaskDetail) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = detail.assignees.iter().map(|u| u.id).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_task() {
        let w = world().await;
        let created = CreateTask::execute(&w.ctx.mutation(), input(w.project_id, vec![w.alice, w.bob]))
            .await
            .unwrap();
        assert_eq!(created.status, 201);
        assert_eq!(created.message, "Task successfully created");

        let fetched = GetTask::execute(&w.ctx.query(), ById { id: created.data.task.id })
            .await
            .unwrap()
            .data;
        assert_eq!(fetched.task.title, "Splice closure 14");
        assert_eq!(fetched.task.status, TaskStatus::InProgress);
        assert_eq!(fetched.task.priority, Priority::High);
        let mut expected = vec![w.alice, w.bob];
        expected.sort();
        assert_eq!(ids(&fetched), expected);
        assert_eq!(fetched.project.unwrap().title, "Backbone");
    }

    #[tokio::test]
    async fn test_edit_replaces_assignee_set() {
        let w = world().await;
        let created = CreateTask::execute(&w.ctx.mutation(), input(w.project_id, vec![w.alice, w.bob]))
            .await
            .unwrap()
            .data;

        let edited = EditTask::execute(
            &w.ctx.mutation(),
            EditTaskInput {
                id: created.task.id,
                task: input(w.project_id, vec![w.carol]),
            },
        )
        .await
        .unwrap()
        .data;

        assert_eq!(ids(&edited), vec![w.carol]);
        let fetched = GetTask::execute(&w.ctx.query(), ById { id: created.task.id })
            .await
            .unwrap()
            .data;
        assert_eq!(ids(&fetched), vec![w.carol]);
    }

    #[tokio::test]
    async fn test_edit_unknown_task_is_not_found() {
        let w = world().await;
        let result = EditTask::execute(
            &w.ctx.mutation(),
            EditTaskInput {
                id: Uuid::new_v4(),
                task: input(w.project_id, vec![]),
            },
        )
        .await;
        assert_err_variant!(result, DeskError::NotFound(_));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_fields() {
        let w = world().await;
        let mut bad = input(w.project_id, vec![]);
        bad.title = "   ".into();
        bad.deadline = "someday".into();
        bad.estimated_hours = -2.0;

        let err = CreateTask::execute(&w.ctx.mutation(), bad).await.unwrap_err();
        let DeskError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("title"));
        assert!(msg.contains("deadline"));
        assert!(msg.contains("estimatedHours"));
    }

    #[tokio::test]
    async fn test_create_with_unknown_references() {
        let w = world().await;
        let result = CreateTask::execute(&w.ctx.mutation(), input(Uuid::new_v4(), vec![])).await;
        assert_err_variant!(result, DeskError::NotFound(_));

        let result =
            CreateTask::execute(&w.ctx.mutation(), input(w.project_id, vec![Uuid::new_v4()])).await;
        assert_err_variant!(result, DeskError::NotFound(_));
    }

    #[tokio::test]
    async fn test_delete_task_with_comments() {
        let w = world().await;
        let task = seed_task(w.ctx.store(), w.project_id, TaskStatus::Todo, vec![])
            .await
            .unwrap();
        for text in ["first", "second"] {
            assert_ok!(
                AddComment::execute(
                    &w.ctx.mutation(),
                    CommentInput {
                        task_id: task.id,
                        text: text.into()
                    }
                )
                .await
            );
        }

        let deleted = DeleteTask::execute(&w.ctx.mutation(), ById { id: task.id }).await.unwrap();
        assert_eq!(deleted.data, Deleted { id: task.id });

        assert_err_variant!(
            GetTask::execute(&w.ctx.query(), ById { id: task.id }).await,
            DeskError::NotFound(_)
        );
        assert_err_variant!(
            DeleteTask::execute(&w.ctx.mutation(), ById { id: task.id }).await,
            DeskError::NotFound(_)
        );
    }

    #[tokio::test]
    async fn test_status_counts() {
        let w = world().await;
        let plan = [
            (TaskStatus::Todo, 2),
            (TaskStatus::InProgress, 1),
            (TaskStatus::Completed, 3),
        ];
        for (status, n) in plan {
            for _ in 0..n {
                seed_task(w.ctx.store(), w.project_id, status, vec![]).await.unwrap();
            }
        }

        let counts = GetTaskStatusCounts::execute(&w.ctx.query(), NoArgs {})
            .await
            .unwrap()
            .data;
        assert_eq!(
            counts,
            StatusCounts {
                backlog: 0,
                todo: 2,
                in_progress: 1,
                completed: 3
            }
        );

        let priorities = GetTaskPriorityCounts::execute(&w.ctx.query(), NoArgs {})
            .await
            .unwrap()
            .data;
        assert_eq!(priorities.medium, 6);
        assert_eq!(priorities.low, 0);
    }

    #[tokio::test]
    async fn test_recent_tasks_cover_all_statuses_and_cap_at_five() {
        let w = world().await;
        let mut created = Vec::new();
        for status in [
            TaskStatus::Completed,
            TaskStatus::Backlog,
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Todo,
        ] {
            created.push(seed_task(w.ctx.store(), w.project_id, status, vec![]).await.unwrap());
        }

        let recent = ListRecentTasks::execute(&w.ctx.query(), RecentTasksArgs::default())
            .await
            .unwrap()
            .data;
        let got: Vec<Uuid> = recent.iter().map(|d| d.task.id).collect();
        let expected: Vec<Uuid> = created.iter().rev().take(5).map(|t| t.id).collect();
        assert_eq!(got, expected);

        let only_open = ListRecentTasks::execute(
            &w.ctx.query(),
            RecentTasksArgs {
                statuses: Some(vec![TaskStatus::InProgress, TaskStatus::Todo]),
            },
        )
        .await
        .unwrap()
        .data;
        assert_eq!(only_open.len(), 3);
        assert!(only_open
            .iter()
            .all(|d| matches!(d.task.status, TaskStatus::InProgress | TaskStatus::Todo)));
    }

    #[tokio::test]
    async fn test_list_tasks_filters_by_assignee() {
        let w = world().await;
        seed_task(w.ctx.store(), w.project_id, TaskStatus::Todo, vec![w.bob]).await.unwrap();
        seed_task(w.ctx.store(), w.project_id, TaskStatus::Todo, vec![w.carol]).await.unwrap();

        let mine = ListTasks::execute(
            &w.ctx.query(),
            ListTasksArgs {
                assignee_id: Some(w.bob),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .data;
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].assignees[0].id, w.bob);

        let all = ListTasks::execute(&w.ctx.query(), ListTasksArgs::default())
            .await
            .unwrap()
            .data;
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_comments_carry_author_name() {
        let w = world().await;
        let task = seed_task(w.ctx.store(), w.project_id, TaskStatus::Todo, vec![])
            .await
            .unwrap();
        AddComment::execute(
            &w.ctx.mutation(),
            CommentInput {
                task_id: task.id,
                text: "  pole 3 leaning  ".into(),
            },
        )
        .await
        .unwrap();

        let comments = ListComments::execute(&w.ctx.query(), ByTask { task_id: task.id })
            .await
            .unwrap()
            .data;
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].comment.text, "pole 3 leaning");
        assert_eq!(comments[0].comment.user_id, w.bob);
        assert_eq!(comments[0].user.first_name, "Bob");
    }

    #[tokio::test]
    async fn test_comment_edge_cases() {
        let w = world().await;
        let task = seed_task(w.ctx.store(), w.project_id, TaskStatus::Todo, vec![])
            .await
            .unwrap();

        let empty = ListComments::execute(&w.ctx.query(), ByTask { task_id: task.id })
            .await
            .unwrap();
        assert!(empty.data.is_empty());

        assert_err_variant!(
            ListComments::execute(&w.ctx.query(), ByTask { task_id: Uuid::new_v4() }).await,
            DeskError::NotFound(_)
        );
        assert_err_variant!(
            AddComment::execute(
                &w.ctx.mutation(),
                CommentInput {
                    task_id: task.id,
                    text: " ".into()
                }
            )
            .await,
            DeskError::Validation(_)
        );
    }

    #[tokio::test]
    async fn test_update_status_any_transition() {
        let w = world().await;
        let task = seed_task(w.ctx.store(), w.project_id, TaskStatus::Completed, vec![])
            .await
            .unwrap();

        let updated = UpdateTaskStatus::execute(
            &w.ctx.mutation(),
            StatusChange {
                id: task.id,
                status: TaskStatus::Backlog,
            },
        )
        .await
        .unwrap()
        .data;
        assert_eq!(updated.status, TaskStatus::Backlog);
    }

    #[tokio::test]
    async fn test_unauthenticated_caller_rejected() {
        let anon = TestContext::new(Arc::new(MemoryStore::new()));
        let result = GetTaskStatusCounts::execute(&anon.query(), NoArgs {}).await;
        assert_err_variant!(result, DeskError::Unauthorized(_));
        assert_eq!(anon.store().access_count(), 0);
    }

    #[test]
    fn test_status_priority_and_estimate_are_required() {
        let full = serde_json::json!({
            "title": "Splice closure 14",
            "description": "Re-splice after storm damage",
            "status": "INPROGRESS",
            "priority": "HIGH",
            "deadline": "2030-01-15",
            "estimatedHours": 3.5,
            "projectId": Uuid::new_v4(),
        });
        assert!(serde_json::from_value::<TaskInput>(full.clone()).is_ok());

        for field in ["status", "priority", "estimatedHours"] {
            let mut partial = full.clone();
            partial.as_object_mut().unwrap().remove(field);
            assert!(
                serde_json::from_value::<TaskInput>(partial.clone()).is_err(),
                "{} should be required",
                field
            );
            partial["id"] = serde_json::json!(Uuid::new_v4());
            assert!(serde_json::from_value::<EditTaskInput>(partial).is_err());
        }
    }
}
