use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use taskdesk_core::config::DatabaseConfig;
use taskdesk_core::error::{DeskError, Result};

/// Pooled PostgreSQL connection shared by the store and the migration runner.
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
    config: DatabaseConfig,
}

impl Database {
    /// Connect using the `[database]` section.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(DeskError::Config("database.url is not set".into()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DeskError::Database(format!("Failed to connect: {}", e)))?;
        info!(pool_size = config.pool_size, "Database pool ready");

        Ok(Self {
            pool: Arc::new(pool),
            config: config.clone(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .map_err(|e| DeskError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub type DatabasePool = PgPool;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_url_is_rejected() {
        let config = DatabaseConfig::default();
        let result = Database::from_config(&config).await;
        assert!(matches!(result, Err(DeskError::Config(_))));
    }
}
