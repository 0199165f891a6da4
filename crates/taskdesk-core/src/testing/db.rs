//! PostgreSQL access for integration tests.
//!
//! Only `TEST_DATABASE_URL` is read, never `DATABASE_URL`. Tests that need a
//! real database call [`TestDatabase::isolated_from_env`] and return early
//! when it yields `None`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{DeskError, Result};

/// Environment variable naming the server used by database tests.
pub const TEST_DATABASE_ENV: &str = "TEST_DATABASE_URL";

/// A connection to the test server's default database.
pub struct TestDatabase {
    pool: PgPool,
    url: String,
}

impl TestDatabase {
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(url)
            .await?;

        Ok(Self {
            pool,
            url: url.to_string(),
        })
    }

    /// Connect using `TEST_DATABASE_URL`.
    pub async fn from_env() -> Result<Self> {
        let url = std::env::var(TEST_DATABASE_ENV).map_err(|_| {
            DeskError::Database(format!(
                "{} not set. Set it explicitly for database tests.",
                TEST_DATABASE_ENV
            ))
        })?;
        Self::from_url(&url).await
    }

    /// A fresh database for `test_name`, or `None` when `TEST_DATABASE_URL`
    /// is unset.
    pub async fn isolated_from_env(test_name: &str) -> Result<Option<IsolatedTestDb>> {
        if std::env::var(TEST_DATABASE_ENV).is_err() {
            return Ok(None);
        }
        let server = Self::from_env().await?;
        let db = server.isolated(test_name).await?;
        server.pool.close().await;
        Ok(Some(db))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Create a uniquely named database for a single test.
    pub async fn isolated(&self, test_name: &str) -> Result<IsolatedTestDb> {
        let db_name = format!(
            "taskdesk_test_{}_{}",
            sanitize_db_name(test_name),
            uuid::Uuid::new_v4().simple()
        );

        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&self.pool)
            .await?;

        let url = replace_db_name(&self.url, &db_name);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(IsolatedTestDb {
            pool,
            db_name,
            url,
            base_url: self.url.clone(),
        })
    }
}

/// A database that lives for one test. Call [`IsolatedTestDb::cleanup`] at
/// the end of the test to drop it.
pub struct IsolatedTestDb {
    pool: PgPool,
    db_name: String,
    url: String,
    base_url: String,
}

impl IsolatedTestDb {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// Connection URL for this database, for opening a second pool.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Drop the database.
    pub async fn cleanup(self) -> Result<()> {
        self.pool.close().await;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_url)
            .await?;

        let _ = sqlx::query(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = $1",
        )
        .bind(&self.db_name)
        .execute(&pool)
        .await;

        sqlx::query(&format!("DROP DATABASE IF EXISTS \"{}\"", self.db_name))
            .execute(&pool)
            .await?;
        pool.close().await;
        Ok(())
    }
}

fn sanitize_db_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(32)
        .collect()
}

/// Swap the database component of a connection URL, keeping any query.
fn replace_db_name(url: &str, new_db: &str) -> String {
    let (head, query) = match url.find('?') {
        Some(idx) => url.split_at(idx),
        None => (url, ""),
    };
    match head.rfind('/') {
        Some(idx) if idx > head.find("://").map(|i| i + 2).unwrap_or(0) => {
            format!("{}{}{}", &head[..=idx], new_db, query)
        }
        _ => format!("{}/{}{}", head, new_db, query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_db_name() {
        assert_eq!(sanitize_db_name("list-tasks filters"), "list_tasks_filters");
        assert_eq!(sanitize_db_name("store::cascade"), "store__cascade");
        assert_eq!(sanitize_db_name(&"x".repeat(40)).len(), 32);
    }

    #[test]
    fn test_replace_db_name() {
        assert_eq!(
            replace_db_name("postgres://u:p@localhost:5432/postgres", "t1"),
            "postgres://u:p@localhost:5432/t1"
        );
        assert_eq!(
            replace_db_name("postgres://localhost/postgres?sslmode=disable", "t1"),
            "postgres://localhost/t1?sslmode=disable"
        );
        assert_eq!(
            replace_db_name("postgres://localhost:5432", "t1"),
            "postgres://localhost:5432/t1"
        );
    }
}
