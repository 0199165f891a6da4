use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{created, ok, require_admin, ById, Deleted, NoArgs, Reply};
use crate::auth::{hash_password, verify_absent_account, verify_password};
use crate::error::{DeskError, Result};
use crate::function::{DeskMutation, DeskQuery, FunctionInfo, MutationContext, QueryContext};
use crate::model::{NewUser, Role, Task, TaskFilter, User, UserPatch, UserSummary, UserTaskCount};
use crate::stats::{top_assignees, TOP_ASSIGNEES};
use crate::store::Store;
use crate::validate::{normalize_email, Violations};

/// Minimum password length for self-registration and profile changes.
pub const SIGNUP_PASSWORD_MIN: usize = 8;
/// Minimum password length for accounts created by an administrator.
pub const ADMIN_PASSWORD_MIN: usize = 6;

const BAD_CREDENTIALS: &str = "Invalid email or password";

/// Bcrypt is CPU-bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| DeskError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// `None` checks against a placeholder hash and never matches.
async fn verify_blocking(password: String, hash: Option<String>) -> Result<bool> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => verify_password(&password, &hash),
        None => verify_absent_account(&password),
    })
    .await
    .map_err(|e| DeskError::Internal(format!("Password check task failed: {}", e)))
}

/// Account fields shared by sign-up, admin creation and the CLI bootstrap.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInput {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Validate and store a new account. Fails with `Conflict` when the email is
/// already registered.
pub async fn create_account(
    store: &dyn Store,
    input: AccountInput,
    role: Role,
    password_min: usize,
) -> Result<User> {
    let mut v = Violations::new();
    v.email("email", &input.email)
        .min_chars("password", &input.password, password_min)
        .non_empty("firstName", &input.first_name)
        .non_empty("lastName", &input.last_name);
    v.finish()?;

    let email = normalize_email(&input.email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(DeskError::Conflict("User already exists".into()));
    }

    let password_hash = hash_blocking(input.password).await?;
    let user = store
        .insert_user(NewUser {
            email,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            position: input.position.unwrap_or_default().trim().to_string(),
            role,
            password_hash,
        })
        .await?;
    info!(user_id = %user.id, role = %user.role, "Account created");
    Ok(user)
}

/// Check credentials. Unknown email and wrong password fail the same way.
pub async fn authenticate(store: &dyn Store, email: &str, password: &str) -> Result<User> {
    let email = normalize_email(email);
    let user = store.find_user_by_email(&email).await?;
    let hash = user.as_ref().map(|u| u.password_hash.clone());
    let matches = verify_blocking(password.to_string(), hash).await?;

    match user {
        Some(user) if matches => Ok(user),
        Some(user) => {
            warn!(user_id = %user.id, "Rejected login with wrong password");
            Err(DeskError::Unauthorized(BAD_CREDENTIALS.into()))
        }
        None => Err(DeskError::Unauthorized(BAD_CREDENTIALS.into())),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub email: String,
}

pub struct Register;

impl DeskMutation for Register {
    type Args = AccountInput;
    type Output = Reply<Registered>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("register")
            .describe("Self-service sign-up")
            .public()
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            let user = create_account(ctx.store(), args, Role::User, SIGNUP_PASSWORD_MIN).await?;
            created(
                "Account created successfully",
                Registered { email: user.email },
            )
        })
    }
}

pub struct CreateUser;

impl DeskMutation for CreateUser {
    type Args = AccountInput;
    type Output = Reply<UserSummary>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("create_user")
            .describe("Create an account with any role")
            .admin_only()
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            require_admin(&ctx.auth)?;
            let role = args.role.unwrap_or_default();
            let user = create_account(ctx.store(), args, role, ADMIN_PASSWORD_MIN).await?;
            created("User successfully created", UserSummary::from(user))
        })
    }
}

pub struct ListUsers;

impl DeskQuery for ListUsers {
    type Args = NoArgs;
    type Output = Reply<Vec<UserSummary>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_users").describe("Every user except the caller")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            let me = ctx.require_user_id()?;
            let users: Vec<UserSummary> = ctx
                .store()
                .list_users()
                .await?
                .into_iter()
                .filter(|u| u.id != me)
                .map(UserSummary::from)
                .collect();
            ok("Users retrieved", users)
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: UserSummary,
    pub tasks: Vec<Task>,
}

pub struct GetUserDetails;

impl DeskQuery for GetUserDetails {
    type Args = ById;
    type Output = Reply<UserDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("get_user_details").describe("A user with their assigned tasks")
    }

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let user = ctx
                .store()
                .get_user(args.id)
                .await?
                .ok_or_else(|| DeskError::not_found("User", args.id))?;
            let filter = TaskFilter {
                assignee_id: Some(user.id),
                ..Default::default()
            };
            let tasks = ctx.store().list_tasks(&filter).await?;
            ok(
                "User found",
                UserDetail {
                    user: user.into(),
                    tasks,
                },
            )
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileInput {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub struct UpdateProfile;

impl DeskMutation for UpdateProfile {
    type Args = ProfileInput;
    type Output = Reply<UserSummary>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("update_profile").describe("Edit the caller's own account")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            let me = ctx.require_user_id()?;
            if args.id != me {
                return Err(DeskError::Forbidden(
                    "You can only edit your own profile".into(),
                ));
            }

            let mut v = Violations::new();
            v.non_empty("firstName", &args.first_name)
                .non_empty("lastName", &args.last_name);
            if let Some(email) = &args.email {
                v.email("email", email);
            }
            if let Some(password) = &args.password {
                v.min_chars("password", password, SIGNUP_PASSWORD_MIN);
            }
            v.finish()?;

            let password_hash = match args.password {
                Some(password) => Some(hash_blocking(password).await?),
                None => None,
            };
            let patch = UserPatch {
                email: args.email.as_deref().map(normalize_email),
                first_name: Some(args.first_name.trim().to_string()),
                last_name: Some(args.last_name.trim().to_string()),
                position: args.position.map(|p| p.trim().to_string()),
                role: None,
                password_hash,
            };
            let user = ctx
                .store()
                .update_user(me, patch)
                .await?
                .ok_or_else(|| DeskError::not_found("User", me))?;
            info!(user_id = %user.id, "Profile updated");
            ok("Profile successfully updated", UserSummary::from(user))
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

pub struct UpdateUser;

impl DeskMutation for UpdateUser {
    type Args = UserChanges;
    type Output = Reply<UserSummary>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("update_user")
            .describe("Edit any user's name, position or role")
            .admin_only()
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            require_admin(&ctx.auth)?;
            let mut v = Violations::new();
            if let Some(first) = &args.first_name {
                v.non_empty("firstName", first);
            }
            if let Some(last) = &args.last_name {
                v.non_empty("lastName", last);
            }
            v.finish()?;

            let patch = UserPatch {
                first_name: args.first_name.map(|s| s.trim().to_string()),
                last_name: args.last_name.map(|s| s.trim().to_string()),
                position: args.position.map(|s| s.trim().to_string()),
                role: args.role,
                ..Default::default()
            };
            let user = ctx
                .store()
                .update_user(args.id, patch)
                .await?
                .ok_or_else(|| DeskError::not_found("User", args.id))?;
            info!(user_id = %user.id, role = %user.role, "User updated");
            ok("User successfully updated", UserSummary::from(user))
        })
    }
}

pub struct DeleteUser;

impl DeskMutation for DeleteUser {
    type Args = ById;
    type Output = Reply<Deleted>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("delete_user")
            .describe("Delete an account, detaching it from projects and tickets")
            .admin_only()
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            let me = ctx.require_user_id()?;
            require_admin(&ctx.auth)?;
            if args.id == me {
                return Err(DeskError::InvalidArgument(
                    "You cannot delete your own account".into(),
                ));
            }
            if !ctx.store().delete_user(args.id).await? {
                return Err(DeskError::not_found("User", args.id));
            }
            info!(user_id = %args.id, "User deleted");
            ok("User successfully deleted", Deleted { id: args.id })
        })
    }
}

pub struct ListUsersWithTaskCount;

impl DeskQuery for ListUsersWithTaskCount {
    type Args = NoArgs;
    type Output = Reply<Vec<UserTaskCount>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_users_with_task_count")
            .describe("The five users with the most assigned tasks")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let users = ctx.store().list_users().await?;
            let counts = ctx.store().assignment_counts().await?;
            ok(
                "Users retrieved",
                top_assignees(users, &counts, TOP_ASSIGNEES),
            )
        })
    }
}
