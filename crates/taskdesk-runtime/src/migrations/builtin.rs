//! Schema migrations shipped with the runtime.
//!
//! Applied before any migrations loaded from a project directory and
//! recorded in `taskdesk_migrations` like any other.

use super::runner::Migration;

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_schema.sql");

pub fn builtin_migrations() -> Vec<Migration> {
    vec![Migration::new("0001_schema", SCHEMA_SQL)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_defines_every_table() {
        let migrations = builtin_migrations();
        assert_eq!(migrations[0].name, "0001_schema");

        let sql = &migrations[0].sql;
        for table in [
            "users",
            "projects",
            "tasks",
            "task_assignees",
            "comments",
            "tickets",
            "installation_progress",
        ] {
            assert!(
                sql.contains(&format!("CREATE TABLE IF NOT EXISTS {} (", table)),
                "missing table {}",
                table
            );
        }
    }

    #[test]
    fn test_schema_cascades() {
        let sql = &builtin_migrations()[0].sql;
        assert!(sql.contains("project_id UUID NOT NULL REFERENCES projects (id) ON DELETE CASCADE"));
        assert!(sql.contains("ticket_id UUID NOT NULL UNIQUE REFERENCES tickets (id) ON DELETE CASCADE"));
        assert!(sql.contains("owner_id UUID REFERENCES users (id) ON DELETE SET NULL"));
    }
}
