//! Migration runner.
//!
//! Concurrent server processes serialise on a PostgreSQL advisory lock, so
//! only one of them applies pending migrations.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::{Connection, PgConnection, PgPool};
use tracing::{debug, info, warn};

use taskdesk_core::error::{DeskError, Result};

/// "TASKDESK" in ASCII.
const MIGRATION_LOCK_ID: i64 = 0x5441_534B_4445_534B;

#[derive(Debug, Clone)]
pub struct Migration {
    /// Unique name, e.g. `0001_schema`. Ordering follows the name.
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppliedMigration {
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Applied and pending migrations, as reported by `taskdesk migrate status`.
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    pub applied: Vec<AppliedMigration>,
    pub pending: Vec<String>,
}

pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply built-in migrations, then `extra`, skipping those already
    /// recorded. Returns the names applied by this call.
    ///
    /// The advisory lock is session scoped, so the lock, every migration and
    /// the unlock share one pooled connection.
    pub async fn run(&self, extra: Vec<Migration>) -> Result<Vec<String>> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            DeskError::Database(format!("Failed to acquire migration connection: {}", e))
        })?;
        acquire_lock(&mut conn).await?;

        let result = apply_pending(&mut conn, extra).await;

        let released = release_lock(&mut conn).await;
        match released {
            Ok(true) => {}
            Ok(false) => warn!("Migration lock was not held at release"),
            Err(e) => {
                warn!("Failed to release migration lock: {}", e);
                // Closing the session drops any lock it still holds.
                drop(conn.detach());
            }
        }

        result
    }

    pub async fn status(&self, extra: &[Migration]) -> Result<MigrationStatus> {
        let mut conn = self.pool.acquire().await.map_err(|e| {
            DeskError::Database(format!("Failed to acquire migration connection: {}", e))
        })?;
        ensure_migrations_table(&mut conn).await?;
        let applied: Vec<AppliedMigration> = sqlx::query_as(
            "SELECT name, applied_at FROM taskdesk_migrations ORDER BY name",
        )
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DeskError::Database(format!("Failed to read migrations: {}", e)))?;

        let names: HashSet<&str> = applied.iter().map(|m| m.name.as_str()).collect();
        let pending = super::builtin::builtin_migrations()
            .iter()
            .chain(extra.iter())
            .filter(|m| !names.contains(m.name.as_str()))
            .map(|m| m.name.clone())
            .collect();

        Ok(MigrationStatus { applied, pending })
    }
}

async fn apply_pending(conn: &mut PgConnection, extra: Vec<Migration>) -> Result<Vec<String>> {
    ensure_migrations_table(conn).await?;
    let applied = applied_names(conn).await?;
    debug!(count = applied.len(), "Migrations already applied");

    let mut newly_applied = Vec::new();
    for migration in super::builtin::builtin_migrations().into_iter().chain(extra) {
        if applied.contains(&migration.name) {
            continue;
        }
        apply(conn, &migration).await?;
        newly_applied.push(migration.name);
    }
    Ok(newly_applied)
}

async fn acquire_lock(conn: &mut PgConnection) -> Result<()> {
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut *conn)
        .await
        .map_err(|e| DeskError::Database(format!("Failed to acquire migration lock: {}", e)))?;
    debug!("Migration lock acquired");
    Ok(())
}

/// `false` when this session did not hold the lock.
async fn release_lock(conn: &mut PgConnection) -> Result<bool> {
    let (released,): (bool,) = sqlx::query_as("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DeskError::Database(format!("Failed to release migration lock: {}", e)))?;
    Ok(released)
}

async fn ensure_migrations_table(conn: &mut PgConnection) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS taskdesk_migrations (
            id SERIAL PRIMARY KEY,
            name VARCHAR(255) UNIQUE NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(&mut *conn)
    .await
    .map_err(|e| DeskError::Database(format!("Failed to create migrations table: {}", e)))?;
    Ok(())
}

async fn applied_names(conn: &mut PgConnection) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT name FROM taskdesk_migrations")
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DeskError::Database(format!("Failed to read migrations: {}", e)))?;
    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Run one migration and record it, all in one transaction.
async fn apply(conn: &mut PgConnection, migration: &Migration) -> Result<()> {
    info!(migration = %migration.name, "Applying migration");
    let failed = |e: sqlx::Error| {
        DeskError::Database(format!("Migration '{}' failed: {}", migration.name, e))
    };

    let mut tx = conn.begin().await.map_err(failed)?;
    for statement in split_statements(&migration.sql) {
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(failed)?;
    }
    sqlx::query("INSERT INTO taskdesk_migrations (name) VALUES ($1)")
        .bind(&migration.name)
        .execute(&mut *tx)
        .await
        .map_err(failed)?;
    tx.commit().await.map_err(failed)?;
    Ok(())
}

/// Split a script on `;`, leaving quoted text (`'...'`, `$$...$$`,
/// `$tag$...$tag$`) intact and dropping `--` comments.
fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut open_tag: Option<&str> = None;
    let mut rest = sql;

    while let Some(c) = rest.chars().next() {
        if let Some(tag) = open_tag {
            if rest.starts_with(tag) {
                current.push_str(tag);
                rest = &rest[tag.len()..];
                open_tag = None;
                continue;
            }
        } else if c == '$' {
            if let Some(tag) = dollar_tag(rest) {
                current.push_str(tag);
                rest = &rest[tag.len()..];
                open_tag = Some(tag);
                continue;
            }
        } else if c == '\'' {
            let end = rest[1..].find('\'').map(|i| i + 2).unwrap_or(rest.len());
            current.push_str(&rest[..end]);
            rest = &rest[end..];
            continue;
        } else if rest.starts_with("--") {
            rest = &rest[rest.find('\n').unwrap_or(rest.len())..];
            continue;
        } else if c == ';' {
            push_statement(&mut statements, &current);
            current.clear();
            rest = &rest[1..];
            continue;
        }
        current.push(c);
        rest = &rest[c.len_utf8()..];
    }
    push_statement(&mut statements, &current);
    statements
}

/// `$$` or `$name$` at the start of `s`.
fn dollar_tag(s: &str) -> Option<&str> {
    let body = &s[1..];
    let end = body.find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))?;
    body[end..].starts_with('$').then(|| &s[..end + 2])
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let statement = raw.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

/// Load `*.sql` files from `dir`, ordered by file name. A missing directory
/// yields no migrations.
pub fn load_migrations_from_dir(dir: &Path) -> Result<Vec<Migration>> {
    if !dir.exists() {
        debug!(dir = %dir.display(), "No migrations directory");
        return Ok(Vec::new());
    }

    let mut migrations = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DeskError::Config(format!("Invalid migration file {:?}", path)))?
            .to_string();
        migrations.push(Migration::new(name, std::fs::read_to_string(&path)?));
    }

    migrations.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    use sqlx::postgres::PgPoolOptions;
    use taskdesk_core::testing::TestDatabase;
    use tempfile::TempDir;

    #[test]
    fn test_missing_dir_yields_nothing() {
        let migrations = load_migrations_from_dir(Path::new("/definitely/not/here")).unwrap();
        assert!(migrations.is_empty());
    }

    #[test]
    fn test_loads_sql_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0003_indexes.sql"), "SELECT 3;").unwrap();
        fs::write(dir.path().join("0002_seed.sql"), "SELECT 2;").unwrap();
        fs::write(dir.path().join("notes.md"), "not a migration").unwrap();
        fs::write(dir.path().join("0004_old.sql.bak"), "SELECT 4;").unwrap();

        let migrations = load_migrations_from_dir(dir.path()).unwrap();
        let names: Vec<&str> = migrations.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["0002_seed", "0003_indexes"]);
        assert_eq!(migrations[0].sql, "SELECT 2;");
    }

    #[test]
    fn test_split_plain_statements() {
        let stmts = split_statements("SELECT 1; SELECT 2;\nSELECT 3");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2", "SELECT 3"]);
    }

    #[test]
    fn test_split_keeps_do_block_whole() {
        let sql = r#"
DO $$
BEGIN
    IF NOT EXISTS (SELECT 1 FROM pg_type WHERE typname = 'priority') THEN
        CREATE TYPE priority AS ENUM ('LOW', 'MEDIUM', 'HIGH');
    END IF;
END
$$;

CREATE TABLE t (id UUID);
"#;
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("DO $$"));
        assert!(stmts[0].ends_with("$$"));
        assert_eq!(stmts[1], "CREATE TABLE t (id UUID)");
    }

    #[test]
    fn test_split_named_tag_and_quotes() {
        let sql = "CREATE FUNCTION f() RETURNS text AS $fn$ SELECT 'a;b'; $fn$ LANGUAGE sql; \
                   INSERT INTO notes VALUES ('x;y')";
        let stmts = split_statements(sql);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("SELECT 'a;b';"));
        assert_eq!(stmts[1], "INSERT INTO notes VALUES ('x;y')");
    }

    #[test]
    fn test_split_drops_comments() {
        let stmts = split_statements("-- header; with semicolon\nSELECT 1;\n-- trailing\n");
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_builtin_schema_splits() {
        let schema = &crate::migrations::builtin_migrations()[0].sql;
        let stmts = split_statements(schema);
        assert!(stmts[0].starts_with("DO $$"));
        assert!(stmts.iter().all(|s| !s.starts_with("--")));
        assert!(stmts
            .iter()
            .any(|s| s.starts_with("CREATE TABLE IF NOT EXISTS installation_progress")));
    }

    async fn advisory_locks_held(pool: &PgPool) -> i64 {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT count(*) FROM pg_locks l JOIN pg_database d ON d.oid = l.database \
             WHERE l.locktype = 'advisory' AND d.datname = current_database()",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        count
    }

    #[tokio::test]
    async fn test_run_releases_lock_with_warm_pool() {
        let Some(db) = TestDatabase::isolated_from_env("runner_lock").await.unwrap() else {
            return;
        };

        // Several idle connections, so a pool-level query could land anywhere.
        let mut warm = Vec::new();
        for _ in 0..4 {
            warm.push(db.pool().acquire().await.unwrap());
        }
        drop(warm);

        let applied = MigrationRunner::new(db.pool().clone())
            .run(Vec::new())
            .await
            .unwrap();
        assert_eq!(applied, vec!["0001_schema".to_string()]);
        assert_eq!(advisory_locks_held(db.pool()).await, 0);

        let other = PgPoolOptions::new()
            .max_connections(1)
            .connect(db.url())
            .await
            .unwrap();
        let second = tokio::time::timeout(
            Duration::from_secs(5),
            MigrationRunner::new(other.clone()).run(Vec::new()),
        )
        .await
        .expect("second runner blocked on the migration lock")
        .unwrap();
        assert!(second.is_empty());

        other.close().await;
        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_status_reports_pending_then_applied() {
        let Some(db) = TestDatabase::isolated_from_env("runner_status").await.unwrap() else {
            return;
        };
        let runner = MigrationRunner::new(db.pool().clone());
        let extra = vec![Migration::new("0002_note", "CREATE TABLE notes (id INT)")];

        let before = runner.status(&extra).await.unwrap();
        assert!(before.applied.is_empty());
        assert_eq!(before.pending, vec!["0001_schema", "0002_note"]);

        runner.run(extra.clone()).await.unwrap();
        let after = runner.status(&extra).await.unwrap();
        assert_eq!(after.applied.len(), 2);
        assert!(after.pending.is_empty());

        db.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_migration_is_not_recorded() {
        let Some(db) = TestDatabase::isolated_from_env("runner_failure").await.unwrap() else {
            return;
        };
        let runner = MigrationRunner::new(db.pool().clone());
        let broken = vec![Migration::new(
            "0002_broken",
            "CREATE TABLE half (id INT); SELECT * FROM missing_table",
        )];

        assert!(runner.run(broken.clone()).await.is_err());
        let status = runner.status(&broken).await.unwrap();
        assert_eq!(status.pending, vec!["0002_broken"]);
        assert_eq!(advisory_locks_held(db.pool()).await, 0);

        db.cleanup().await.unwrap();
    }
}
