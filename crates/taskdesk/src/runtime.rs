//! Process runtime: logging, store selection, migrations and the HTTP gateway.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use taskdesk_core::config::LoggingConfig;
use taskdesk_core::error::{DeskError, Result};
use taskdesk_core::{DeskConfig, MemoryStore, Store};
use taskdesk_runtime::function::{register_all, FunctionRegistry};
use taskdesk_runtime::gateway::{GatewayConfig, GatewayServer};
use taskdesk_runtime::migrations::{load_migrations_from_dir, Migration, MigrationRunner};
use taskdesk_runtime::{Database, PgStore};

/// Where records live for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local maps. Everything is lost on exit.
    InMemory,
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
pub fn init_logging(config: &LoggingConfig, dev: bool) -> anyhow::Result<()> {
    let level = if dev { "debug" } else { config.level.as_str() };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}

/// The taskdesk server.
pub struct Taskdesk {
    config: DeskConfig,
    backend: StoreBackend,
    registry: FunctionRegistry,
    migrations_dir: Option<PathBuf>,
    extra_migrations: Vec<Migration>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Taskdesk {
    pub fn builder() -> TaskdeskBuilder {
        TaskdeskBuilder::new()
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    pub fn function_registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Sender that stops a running server when signalled.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Serve until Ctrl-C or a shutdown signal, then drain and close the pool.
    pub async fn run(self) -> Result<()> {
        tracing::info!(backend = ?self.backend, "taskdesk starting");

        let gateway_config = GatewayConfig::from_config(&self.config)?;

        let (store, db): (Arc<dyn Store>, Option<Database>) = match self.backend {
            StoreBackend::InMemory => {
                tracing::warn!("Using the in-memory store; data is not persisted");
                (Arc::new(MemoryStore::new()), None)
            }
            StoreBackend::Postgres => {
                let db = Database::from_config(&self.config.database).await?;
                if self.config.database.auto_migrate {
                    let mut extra = match &self.migrations_dir {
                        Some(dir) => load_migrations_from_dir(dir)?,
                        None => Vec::new(),
                    };
                    extra.extend(self.extra_migrations);
                    let applied = MigrationRunner::new(db.pool().clone()).run(extra).await?;
                    tracing::info!(applied = applied.len(), "Migrations completed");
                }
                (Arc::new(PgStore::new(db.pool().clone())), Some(db))
            }
        };

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let shutdown = async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                    }
                    tracing::info!("Received shutdown signal");
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown notification");
                }
            }
        };

        let served = GatewayServer::new(gateway_config, self.registry, store)
            .run_until(shutdown)
            .await;

        if let Some(db) = db {
            db.close().await;
        }

        tracing::info!("taskdesk stopped");
        served
    }
}

/// Builder for [`Taskdesk`].
pub struct TaskdeskBuilder {
    config: Option<DeskConfig>,
    backend: StoreBackend,
    migrations_dir: Option<PathBuf>,
    extra_migrations: Vec<Migration>,
}

impl TaskdeskBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            backend: StoreBackend::Postgres,
            migrations_dir: None,
            extra_migrations: Vec::new(),
        }
    }

    pub fn config(mut self, config: DeskConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn backend(mut self, backend: StoreBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Apply `*.sql` files from `path` after the built-in schema.
    pub fn migrations_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.migrations_dir = Some(path.into());
        self
    }

    pub fn migration(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.extra_migrations.push(Migration::new(name, sql));
        self
    }

    pub fn build(self) -> Result<Taskdesk> {
        let config = self
            .config
            .ok_or_else(|| DeskError::Config("Configuration is required".to_string()))?;
        config.jwt_secret()?;
        if self.backend == StoreBackend::Postgres && !config.database.is_configured() {
            return Err(DeskError::Config(
                "database.url must be set unless running in memory".to_string(),
            ));
        }

        let mut registry = FunctionRegistry::new();
        register_all(&mut registry);

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Taskdesk {
            config,
            backend: self.backend,
            registry,
            migrations_dir: self.migrations_dir,
            extra_migrations: self.extra_migrations,
            shutdown_tx,
        })
    }
}

impl Default for TaskdeskBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> DeskConfig {
        let mut config = DeskConfig::default_with_database_url("postgres://localhost/taskdesk");
        config.security.auth.jwt_secret = Some("runtime-test-secret".to_string());
        config
    }

    #[test]
    fn test_builder_requires_config() {
        assert!(TaskdeskBuilder::new().build().is_err());
    }

    #[test]
    fn test_builder_requires_jwt_secret() {
        let mut config = config();
        config.security.auth.jwt_secret = None;
        let err = Taskdesk::builder().config(config).build().err().unwrap();
        assert!(matches!(err, DeskError::Config(_)));
    }

    #[test]
    fn test_in_memory_does_not_need_database() {
        let mut config = config();
        config.database.url = String::new();
        assert!(Taskdesk::builder().config(config.clone()).build().is_err());

        let desk = Taskdesk::builder()
            .config(config)
            .backend(StoreBackend::InMemory)
            .build()
            .unwrap();
        assert_eq!(desk.backend(), StoreBackend::InMemory);
        assert_eq!(desk.function_registry().len(), 32);
    }

    #[tokio::test]
    async fn test_shutdown_handle_stops_in_memory_server() {
        let mut config = config();
        config.gateway.host = "127.0.0.1".to_string();
        config.gateway.port = 0;
        let desk = Taskdesk::builder()
            .config(config)
            .backend(StoreBackend::InMemory)
            .build()
            .unwrap();

        let stop = desk.shutdown_handle();
        let server = tokio::spawn(desk.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        stop.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
