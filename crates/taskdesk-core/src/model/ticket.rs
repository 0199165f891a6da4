use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::enums::{TicketStatus, TicketType};
use super::user::UserSummary;

/// A field ticket.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: TicketType,
    pub status: TicketStatus,
    pub activity_type: Option<String>,
    pub remarks: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub kind: TicketType,
    pub activity_type: Option<String>,
    pub remarks: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Fields merged into a ticket on update; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub activity_type: Option<String>,
    pub remarks: Option<String>,
    pub user_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The six installation milestones, each a percentage in `0..=100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressValues {
    pub pole_excavation: i32,
    pub cable_laid: i32,
    pub nap_lcp_mounted: i32,
    pub pole_erected: i32,
    pub cable_fixed: i32,
    pub nap_lcp_spliced: i32,
}

impl ProgressValues {
    pub fn fields(&self) -> [(&'static str, i32); 6] {
        [
            ("poleExcavation", self.pole_excavation),
            ("cableLaid", self.cable_laid),
            ("napLcpMounted", self.nap_lcp_mounted),
            ("poleErected", self.pole_erected),
            ("cableFixed", self.cable_fixed),
            ("napLcpSpliced", self.nap_lcp_spliced),
        ]
    }
}

/// Installation progress attached one-to-one to a ticket.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InstallationProgress {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub pole_excavation: i32,
    pub cable_laid: i32,
    pub nap_lcp_mounted: i32,
    pub pole_erected: i32,
    pub cable_fixed: i32,
    pub nap_lcp_spliced: i32,
    pub updated_at: DateTime<Utc>,
}

impl InstallationProgress {
    pub fn values(&self) -> ProgressValues {
        ProgressValues {
            pole_excavation: self.pole_excavation,
            cable_laid: self.cable_laid,
            nap_lcp_mounted: self.nap_lcp_mounted,
            pole_erected: self.pole_erected,
            cable_fixed: self.cable_fixed,
            nap_lcp_spliced: self.nap_lcp_spliced,
        }
    }
}

/// A ticket with its assignee and progress eagerly loaded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub assigned_to: Option<UserSummary>,
    pub installation_progress: Option<InstallationProgress>,
}
