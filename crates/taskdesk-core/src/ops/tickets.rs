use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{created, ok, ById, Deleted, NoArgs, Reply};
use crate::error::{DeskError, Result};
use crate::function::{DeskMutation, DeskQuery, FunctionInfo, MutationContext, QueryContext};
use crate::model::{
    InstallationProgress, NewTicket, ProgressValues, Ticket, TicketDetail, TicketPatch,
    TicketStatus, TicketType, UserSummary,
};
use crate::stats::TicketStats;
use crate::store::Store;
use crate::validate::Violations;

const ACTIVITY_TYPE_MAX: usize = 100;

/// Load assignees and progress for tickets, keeping their order.
pub async fn ticket_details(store: &dyn Store, tickets: Vec<Ticket>) -> Result<Vec<TicketDetail>> {
    let ids: Vec<Uuid> = tickets.iter().map(|t| t.id).collect();
    let user_ids: Vec<Uuid> = tickets.iter().filter_map(|t| t.user_id).collect();

    let mut progress = store.progress_for(&ids).await?;
    let users = store.users_by_ids(&user_ids).await?;

    Ok(tickets
        .into_iter()
        .map(|ticket| TicketDetail {
            assigned_to: ticket
                .user_id
                .and_then(|id| users.get(&id))
                .map(UserSummary::from),
            installation_progress: progress.remove(&ticket.id),
            ticket,
        })
        .collect())
}

async fn ticket_detail(store: &dyn Store, ticket: Ticket) -> Result<TicketDetail> {
    ticket_details(store, vec![ticket])
        .await?
        .pop()
        .ok_or_else(|| DeskError::Internal("ticket detail lost".into()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketInput {
    #[serde(rename = "type")]
    pub kind: TicketType,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub activity_type: Option<String>,
}

pub struct CreateTicket;

impl DeskMutation for CreateTicket {
    type Args = TicketInput;
    type Output = Reply<TicketDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("create_ticket")
            .describe("Open a ticket; installation tickets start with zeroed progress")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let mut v = Violations::new();
            if let Some(activity) = &args.activity_type {
                v.max_chars("activityType", activity, ACTIVITY_TYPE_MAX);
            }
            v.finish()?;

            let (ticket, progress) = ctx
                .store()
                .insert_ticket(NewTicket {
                    kind: args.kind,
                    activity_type: args.activity_type,
                    remarks: args.remarks,
                    user_id: args.user_id,
                })
                .await?;
            info!(
                ticket_id = %ticket.id,
                kind = ?ticket.kind,
                with_progress = progress.is_some(),
                "Ticket created"
            );

            let detail = ticket_detail(ctx.store(), ticket).await?;
            created("Ticket successfully created", detail)
        })
    }
}

/// Fields a ticket update may change; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketChanges {
    #[serde(default)]
    pub status: Option<TicketStatus>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub activity_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTicketInput {
    pub id: Uuid,
    pub data: TicketChanges,
}

pub struct UpdateTicket;

impl DeskMutation for UpdateTicket {
    type Args = UpdateTicketInput;
    type Output = Reply<TicketDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("update_ticket").describe("Merge changes into a ticket")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let changes = args.data;
            let mut v = Violations::new();
            if let Some(activity) = &changes.activity_type {
                v.max_chars("activityType", activity, ACTIVITY_TYPE_MAX);
            }
            v.finish()?;

            // completedAt is stamped on every DONE update and never cleared.
            let completed_at = (changes.status == Some(TicketStatus::Done)).then(Utc::now);
            let ticket = ctx
                .store()
                .update_ticket(
                    args.id,
                    TicketPatch {
                        status: changes.status,
                        activity_type: changes.activity_type,
                        remarks: changes.remarks,
                        user_id: changes.user_id,
                        completed_at,
                    },
                )
                .await?
                .ok_or_else(|| DeskError::not_found("Ticket", args.id))?;
            info!(ticket_id = %ticket.id, status = ?ticket.status, "Ticket updated");

            let detail = ticket_detail(ctx.store(), ticket).await?;
            ok("Ticket successfully updated", detail)
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInput {
    pub ticket_id: Uuid,
    pub data: ProgressValues,
}

pub struct UpdateTicketProgress;

impl DeskMutation for UpdateTicketProgress {
    type Args = ProgressInput;
    type Output = Reply<InstallationProgress>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("update_ticket_progress")
            .describe("Replace the six installation percentages of a ticket")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let mut v = Violations::new();
            for (field, value) in args.data.fields() {
                v.percent(field, value);
            }
            v.finish()?;

            let progress = ctx
                .store()
                .update_progress(args.ticket_id, args.data)
                .await?
                .ok_or_else(|| {
                    DeskError::NotFound(format!(
                        "Installation progress for ticket '{}' not found",
                        args.ticket_id
                    ))
                })?;
            info!(ticket_id = %args.ticket_id, "Installation progress updated");
            ok("Progress successfully updated", progress)
        })
    }
}

pub struct DeleteTicket;

impl DeskMutation for DeleteTicket {
    type Args = ById;
    type Output = Reply<Deleted>;

    fn info() -> FunctionInfo {
        FunctionInfo::mutation("delete_ticket")
    }

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            if !ctx.store().delete_ticket(args.id).await? {
                return Err(DeskError::not_found("Ticket", args.id));
            }
            info!(ticket_id = %args.id, "Ticket deleted");
            ok("Ticket successfully deleted", Deleted { id: args.id })
        })
    }
}

pub struct ListTickets;

impl DeskQuery for ListTickets {
    type Args = NoArgs;
    type Output = Reply<Vec<TicketDetail>>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("list_tickets").describe("All tickets, newest first")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let tickets = ctx.store().list_tickets().await?;
            let details = ticket_details(ctx.store(), tickets).await?;
            ok("Tickets retrieved", details)
        })
    }
}

pub struct GetTicket;

impl DeskQuery for GetTicket {
    type Args = ById;
    type Output = Reply<TicketDetail>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("get_ticket")
    }

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let ticket = ctx
                .store()
                .get_ticket(args.id)
                .await?
                .ok_or_else(|| DeskError::not_found("Ticket", args.id))?;
            let detail = ticket_detail(ctx.store(), ticket).await?;
            ok("Ticket found", detail)
        })
    }
}

pub struct GetTicketStats;

impl DeskQuery for GetTicketStats {
    type Args = NoArgs;
    type Output = Reply<TicketStats>;

    fn info() -> FunctionInfo {
        FunctionInfo::query("get_ticket_stats")
    }

    fn execute(
        ctx: &QueryContext,
        _args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>> {
        Box::pin(async move {
            ctx.require_user_id()?;
            let by_type = ctx.store().count_tickets_by_type().await?;
            let by_status = ctx.store().count_tickets_by_status().await?;
            ok(
                "Ticket statistics",
                TicketStats::from_groups(&by_type, &by_status),
            )
        })
    }
}
