//! Every domain operation exposed over RPC.

use taskdesk_core::ops::{projects, tasks, tickets, users};

use super::registry::FunctionRegistry;

pub fn register_all(registry: &mut FunctionRegistry) {
    // Tasks and comments
    registry.register_mutation::<tasks::CreateTask>();
    registry.register_mutation::<tasks::EditTask>();
    registry.register_mutation::<tasks::UpdateTaskStatus>();
    registry.register_mutation::<tasks::DeleteTask>();
    registry.register_query::<tasks::GetTask>();
    registry.register_query::<tasks::ListTasks>();
    registry.register_query::<tasks::ListRecentTasks>();
    registry.register_query::<tasks::GetTaskStatusCounts>();
    registry.register_query::<tasks::GetTaskPriorityCounts>();
    registry.register_mutation::<tasks::AddComment>();
    registry.register_query::<tasks::ListComments>();

    // Tickets
    registry.register_mutation::<tickets::CreateTicket>();
    registry.register_mutation::<tickets::UpdateTicket>();
    registry.register_mutation::<tickets::UpdateTicketProgress>();
    registry.register_mutation::<tickets::DeleteTicket>();
    registry.register_query::<tickets::ListTickets>();
    registry.register_query::<tickets::GetTicket>();
    registry.register_query::<tickets::GetTicketStats>();

    // Projects
    registry.register_mutation::<projects::CreateProject>();
    registry.register_mutation::<projects::UpdateProject>();
    registry.register_mutation::<projects::DeleteProject>();
    registry.register_query::<projects::ListProjects>();
    registry.register_query::<projects::GetProject>();
    registry.register_query::<projects::ListProjectsWithTaskCount>();

    // Users
    registry.register_mutation::<users::Register>();
    registry.register_mutation::<users::CreateUser>();
    registry.register_query::<users::ListUsers>();
    registry.register_query::<users::GetUserDetails>();
    registry.register_mutation::<users::UpdateProfile>();
    registry.register_mutation::<users::UpdateUser>();
    registry.register_mutation::<users::DeleteUser>();
    registry.register_query::<users::ListUsersWithTaskCount>();
}
