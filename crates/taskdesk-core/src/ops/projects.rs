use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{created, ok, require_admin, ById, Deleted, NoArgs, Reply};
use crate::error::{DeskError, Result};
use crate::function::{DeskMutation, DeskQuery, FunctionInfo, MutationContext, QueryContext};
use crate::model::{
    Priority, Project, ProjectDetail, ProjectRecord, ProjectStatus, ProjectTaskCount, TaskFilter,
    TaskOrder,
};
use crate::stats::{project_task, project_task_counts};
use crate::validate::{normalize_tags, Violations};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: Priority,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProjectInput {
    fn into_record(self) -> Result<ProjectRecord> {
        let mut v = Violations::new();
        v.non_empty("title", &self.title);
        if let Some(budget) = self.budget {
            v.non_negative("budget", budget);
        }
        let start = v.date("startDate", &self.start_date);
        let end = v.date("endDate", &self.end_date);
        if let (Some(start), Some(end)) = (start, end) {
            v.check(end >= start, "endDate", "must not be before startDate");
        }
        v.finish()?;

        let (Some(start_date), Some(end_date)) = (start, end) else {
            return Err(DeskError::Validation("startDate/endDate: missing".into()));
        };
        Ok(ProjectRecord {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            status: self.status,
            priority: self.priority,
            start_date,
            end_date,
            budget: self.budget,
            tags: normalize_tags(self.tags),
        })
    }
}

pub struct CreateProject;

impl DeskMutation for CreateProject {
    type Args = ProjectInput;
    type Output = Reply<Project>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("create_project")
            .describe("Create a project owned by the caller")
            .admin_only()
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            let owner_id = ctx.require_user_id()?;
            require_admin(&ctx.auth)?;
            let record = args.into_record()?;

            let project = ctx.store().insert_project(owner_id, record).await?;
            info!(project_id = %project.id, owner_id = %owner_id, "Project created");
            created("Project successfully created", project)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProjectInput {
    pub id: Uuid,
    #[serde(flatten)]
    pub project: ProjectInput,
}

pub struct UpdateProject;

impl DeskMutation for UpdateProject {
    type Args = UpdateProjectInput;
    type Output = Reply<Project>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("update_project").admin_only()
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            require_admin(&ctx.auth)?;
            let record = args.project.into_record()?;

            let project = ctx
                .store()
                .update_project(args.id, record)
                .await?
                .ok_or_else(|| DeskError::not_found("Project", args.id))?;
            info!(project_id = %project.id, "Project updated");
            ok("Project successfully updated", project)
        })
    }
}

pub struct DeleteProject;

impl DeskMutation for DeleteProject {
    type Args = ById;
    type Output = Reply<Deleted>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("delete_project")
            .describe("Delete a project and all of its tasks")
            .admin_only()
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            require_admin(&ctx.auth)?;
            if !ctx.store().delete_project(args.id).await? {
                return Err(DeskError::not_found("Project", args.id));
            }
            info!(project_id = %args.id, "Project deleted");
            ok("Project successfully deleted", Deleted { id: args.id })
        })
    }
}

pub struct ListProjects;

impl DeskQuery for ListProjects {
    type Args = NoArgs;
    type Output = Reply<Vec<Project>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_projects").describe("All projects, newest first")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let show_budget = ctx.auth.is_admin();
            let projects: Vec<Project> = ctx
                .store()
                .list_projects()
                .await?
                .into_iter()
                .map(|p| p.redacted(show_budget))
                .collect();
            ok("Projects retrieved", projects)
        })
    }
}

pub struct GetProject;

impl DeskQuery for GetProject {
    type Args = ById;
    type Output = Reply<ProjectDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("get_project").describe("A project with its tasks")
    }

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let store = ctx.store();
            let project = store
                .get_project(args.id)
                .await?
                .ok_or_else(|| DeskError::not_found("Project", args.id))?;

            let filter = TaskFilter {
                project_id: Some(project.id),
                order: TaskOrder::DeadlineAsc,
                ..Default::default()
            };
            let tasks = store.list_tasks(&filter).await?;
            let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
            let assignees = store.assignees_for(&ids).await?;

            ok(
                "Project found",
                ProjectDetail {
                    project: project.redacted(ctx.auth.is_admin()),
                    tasks: tasks
                        .iter()
                        .map(|t| project_task(t, assignees.get(&t.id)))
                        .collect(),
                },
            )
        })
    }
}

pub struct ListProjectsWithTaskCount;

impl DeskQuery for ListProjectsWithTaskCount {
    type Args = NoArgs;
    type Output = Reply<Vec<ProjectTaskCount>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_projects_with_task_count")
            .describe("Every project with its task count and tasks by deadline")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let store = ctx.store();
            let projects = store.list_projects().await?;
            let tasks = store.list_tasks(&TaskFilter::default()).await?;
            let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
            let assignees = store.assignees_for(&ids).await?;

            ok(
                "Projects retrieved",
                project_task_counts(projects, &tasks, &assignees),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{Role, TaskStatus};
    use crate::assert_err_variant;
    use crate::store::{MemoryStore, Store};
    use crate::testing::{seed_project, seed_task, seed_user, TestContext};

    struct World {
        admin: TestContext,
        member: TestContext,
    }

    async fn world() -> World {
        let store = Arc::new(MemoryStore::new());
        let admin = seed_user(store.as_ref(), "Ada", Role::Admin).await.unwrap();
        let member = seed_user(store.as_ref(), "Max", Role::User).await.unwrap();
        World {
            admin: TestContext::new(store.clone()).as_user(admin.id).with_role("ADMIN"),
            member: TestContext::new(store).as_user(member.id).with_role("USER"),
        }
    }

    fn input(title: &str) -> ProjectInput {
        ProjectInput {
            title: title.into(),
            description: "Ring extension".into(),
            status: ProjectStatus::Planning,
            priority: Priority::High,
            start_date: "2030-01-01".into(),
            end_date: "2030-06-30".into(),
            budget: Some(25_000.0),
            tags: vec!["fibre".into(), " fibre ".into(), "east".into()],
        }
    }

    #[tokio::test]
    async fn test_admin_creates_project_owned_by_caller() {
        let w = world().await;
        let reply = CreateProject::execute(&w.admin.mutation(), input("East ring"))
            .await
            .unwrap();
        assert_eq!(reply.status, 201);
        assert_eq!(reply.data.owner_id, w.admin.auth().user_id());
        assert_eq!(reply.data.tags, vec!["fibre", "east"]);
        assert_eq!(reply.data.status, ProjectStatus::Planning);
    }

    #[tokio::test]
    async fn test_member_cannot_create_project() {
        let w = world().await;
        let result = CreateProject::execute(&w.member.mutation(), input("Nope")).await;
        assert_err_variant!(result, DeskError::Forbidden(_));
        assert!(w.member.store().list_projects().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dates_and_budget_validated() {
        let w = world().await;
        let mut bad = input("Backwards");
        bad.start_date = "2030-06-30".into();
        bad.end_date = "2030-01-01".into();
        bad.budget = Some(-1.0);

        let err = CreateProject::execute(&w.admin.mutation(), bad).await.unwrap_err();
        let DeskError::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("endDate"));
        assert!(msg.contains("budget"));
    }

    #[tokio::test]
    async fn test_budget_only_visible_to_admin() {
        let w = world().await;
        let created = CreateProject::execute(&w.admin.mutation(), input("Core"))
            .await
            .unwrap()
            .data;

        let as_admin = ListProjects::execute(&w.admin.query(), NoArgs {}).await.unwrap().data;
        assert_eq!(as_admin[0].budget, Some(25_000.0));

        let as_member = ListProjects::execute(&w.member.query(), NoArgs {}).await.unwrap().data;
        assert_eq!(as_member[0].budget, None);
        let json = serde_json::to_value(&as_member[0]).unwrap();
        assert!(json.get("budget").is_none());

        let detail = GetProject::execute(&w.member.query(), ById { id: created.id })
            .await
            .unwrap()
            .data;
        assert_eq!(detail.project.budget, None);
    }

    #[tokio::test]
    async fn test_get_project_lists_tasks_by_deadline() {
        let w = world().await;
        let owner = w.admin.auth().user_id().unwrap();
        let project = seed_project(w.admin.store(), owner, "Metro").await.unwrap();
        let task = seed_task(w.admin.store(), project.id, TaskStatus::Todo, vec![owner])
            .await
            .unwrap();

        let detail = GetProject::execute(&w.member.query(), ById { id: project.id })
            .await
            .unwrap()
            .data;
        assert_eq!(detail.tasks.len(), 1);
        assert_eq!(detail.tasks[0].id, task.id);
        assert_eq!(detail.tasks[0].assignees[0].id, owner);

        assert_err_variant!(
            GetProject::execute(&w.member.query(), ById { id: Uuid::new_v4() }).await,
            DeskError::NotFound(_)
        );
    }

    #[tokio::test]
    async fn test_task_counts_exclude_nothing() {
        let w = world().await;
        let owner = w.admin.auth().user_id().unwrap();
        let a = seed_project(w.admin.store(), owner, "A").await.unwrap();
        let b = seed_project(w.admin.store(), owner, "B").await.unwrap();
        for _ in 0..2 {
            seed_task(w.admin.store(), a.id, TaskStatus::Todo, vec![]).await.unwrap();
        }

        let rows = ListProjectsWithTaskCount::execute(&w.member.query(), NoArgs {})
            .await
            .unwrap()
            .data;
        assert_eq!(rows.len(), 2);
        let count = |id: Uuid| rows.iter().find(|r| r.id == id).unwrap().task_count;
        assert_eq!(count(a.id), 2);
        assert_eq!(count(b.id), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete_project() {
        let w = world().await;
        let project = CreateProject::execute(&w.admin.mutation(), input("Old"))
            .await
            .unwrap()
            .data;
        seed_task(w.admin.store(), project.id, TaskStatus::Todo, vec![]).await.unwrap();

        let mut changed = input("New");
        changed.tags = vec![];
        changed.budget = None;
        let updated = UpdateProject::execute(
            &w.admin.mutation(),
            UpdateProjectInput {
                id: project.id,
                project: changed,
            },
        )
        .await
        .unwrap()
        .data;
        assert_eq!(updated.title, "New");
        assert!(updated.tags.is_empty());
        assert_eq!(updated.budget, None);

        DeleteProject::execute(&w.admin.mutation(), ById { id: project.id })
            .await
            .unwrap();
        let tasks = w.admin.store().list_tasks(&TaskFilter::default()).await.unwrap();
        assert!(tasks.is_empty());
        assert_err_variant!(
            DeleteProject::execute(&w.admin.mutation(), ById { id: project.id }).await,
            DeskError::NotFound(_)
        );
    }
}
