use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use taskdesk_runtime::migrations::{load_migrations_from_dir, MigrationRunner};
use taskdesk_runtime::Database;

use super::{load_config, DEFAULT_CONFIG};

/// Manage database migrations.
#[derive(Parser)]
pub struct MigrateCommand {
    #[command(subcommand)]
    pub action: MigrateAction,

    /// Configuration file path.
    #[arg(short, long, default_value = DEFAULT_CONFIG, global = true)]
    pub config: String,

    /// Directory with additional `*.sql` migrations.
    #[arg(short, long, default_value = "migrations", global = true)]
    pub migrations_dir: String,
}

#[derive(Subcommand)]
pub enum MigrateAction {
    /// Apply the built-in schema and any pending migrations.
    Up,

    /// Show applied and pending migrations.
    Status,
}

impl MigrateCommand {
    pub async fn execute(self) -> Result<()> {
        let config = load_config(&self.config)?;
        let extra = load_migrations_from_dir(Path::new(&self.migrations_dir))?;

        let db = Database::from_config(&config.database).await?;
        let runner = MigrationRunner::new(db.pool().clone());

        println!();
        match self.action {
            MigrateAction::Up => {
                println!("  {} Running pending migrations...", style("→").dim());
                let applied = runner.run(extra).await?;

                if applied.is_empty() {
                    println!("  {} Schema is up to date", style("ℹ").blue());
                } else {
                    for name in &applied {
                        println!("  {} Applied {}", style("✓").green(), style(name).cyan());
                    }
                }
            }

            MigrateAction::Status => {
                let status = runner.status(&extra).await?;

                if !status.applied.is_empty() {
                    println!("  {} Applied:", style("✓").green());
                    for m in &status.applied {
                        println!(
                            "    {} {} ({})",
                            style("-").dim(),
                            style(&m.name).cyan(),
                            m.applied_at.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }

                if !status.pending.is_empty() {
                    println!("  {} Pending:", style("○").yellow());
                    for name in &status.pending {
                        println!("    {} {}", style("→").dim(), style(name).yellow());
                    }
                }

                println!(
                    "  {} {} applied, {} pending",
                    style("ℹ").blue(),
                    status.applied.len(),
                    status.pending.len()
                );
            }
        }
        println!();

        db.close().await;
        Ok(())
    }
}
