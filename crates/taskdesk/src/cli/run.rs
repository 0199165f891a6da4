use anyhow::Result;
use clap::Parser;
use console::style;
use tracing::info;

use taskdesk::{init_logging, DeskConfig, StoreBackend, Taskdesk};

use super::{load_config, DEFAULT_CONFIG};

/// Run the HTTP server.
#[derive(Parser)]
pub struct RunCommand {
    /// Configuration file path.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    pub config: String,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    pub host: Option<String>,

    /// Verbose logging.
    #[arg(long)]
    pub dev: bool,

    /// Keep all records in memory instead of PostgreSQL.
    #[arg(long)]
    pub in_memory: bool,

    /// Directory with additional `*.sql` migrations.
    #[arg(long)]
    pub migrations_dir: Option<String>,
}

impl RunCommand {
    pub async fn execute(self) -> Result<()> {
        let mut config = load_config(&self.config)?;
        self.apply_overrides(&mut config);

        init_logging(&config.observability.logging, self.dev)?;
        info!(config = %self.config, "Configuration loaded");

        println!();
        println!(
            "  {} v{}",
            style("taskdesk").bold().cyan(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "  {} Listening on {}",
            style("→").dim(),
            style(format!(
                "http://{}:{}",
                config.gateway.host, config.gateway.port
            ))
            .cyan()
        );
        if self.in_memory {
            println!(
                "  {} In-memory store, nothing is persisted",
                style("!").yellow()
            );
        }
        println!();

        let mut builder = Taskdesk::builder().config(config).backend(self.backend());
        if let Some(dir) = &self.migrations_dir {
            builder = builder.migrations_dir(dir);
        }

        builder.build()?.run().await?;

        println!("\n  {} Stopped", style("✓").green());
        Ok(())
    }

    fn apply_overrides(&self, config: &mut DeskConfig) {
        if let Some(port) = self.port {
            config.gateway.port = port;
        }
        if let Some(host) = &self.host {
            config.gateway.host = host.clone();
        }
    }

    fn backend(&self) -> StoreBackend {
        if self.in_memory {
            StoreBackend::InMemory
        } else {
            StoreBackend::Postgres
        }
    }
}
