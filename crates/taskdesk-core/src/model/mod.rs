//! Domain entities, their projections, and the validated records the store
//! accepts.

mod comment;
mod enums;
mod project;
mod task;
mod ticket;
mod user;

pub use comment::{AuthorName, Comment, CommentWithAuthor, NewComment};
pub use enums::{Priority, ProjectStatus, Role, TaskStatus, TicketStatus, TicketType};
pub use project::{Project, ProjectDetail, ProjectRecord, ProjectRef, ProjectTask, ProjectTaskCount};
pub use task::{Task, TaskDetail, TaskFilter, TaskOrder, TaskRecord};
pub use ticket::{
    InstallationProgress, NewTicket, ProgressValues, Ticket, TicketDetail, TicketPatch,
};
pub use user::{NewUser, User, UserPatch, UserSummary, UserTaskCount};
