mod admin;
mod init;
mod migrate;
mod run;

pub use admin::AdminCommand;
pub use init::InitCommand;
pub use migrate::MigrateCommand;
pub use run::RunCommand;

use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};

use taskdesk::DeskConfig;

pub const DEFAULT_CONFIG: &str = "taskdesk.toml";

/// taskdesk - tasks, projects and support tickets
#[derive(Parser)]
#[command(name = "taskdesk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server.
    Run(RunCommand),

    /// Manage database migrations.
    Migrate(MigrateCommand),

    /// Write a starter taskdesk.toml.
    Init(InitCommand),

    /// Manage administrator accounts.
    Admin(AdminCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::Migrate(cmd) => cmd.execute().await,
            Commands::Init(cmd) => cmd.execute(),
            Commands::Admin(cmd) => cmd.execute().await,
        }
    }
}

/// Read `.env` if present, then the config file.
pub fn load_config(path: &str) -> Result<DeskConfig> {
    dotenvy::dotenv().ok();

    if !Path::new(path).exists() {
        anyhow::bail!(
            "Configuration file not found: {}\nRun `taskdesk init` to create one.",
            path
        );
    }
    Ok(DeskConfig::from_file(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_run() {
        let cli = Cli::try_parse_from(["taskdesk", "run", "--port", "9000", "--in-memory"]).unwrap();
        match cli.command {
            Commands::Run(cmd) => {
                assert_eq!(cmd.port, Some(9000));
                assert!(cmd.in_memory);
                assert_eq!(cmd.config, DEFAULT_CONFIG);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_parse_migrate() {
        assert!(Cli::try_parse_from(["taskdesk", "migrate", "up"]).is_ok());
        assert!(Cli::try_parse_from(["taskdesk", "migrate", "status"]).is_ok());
        assert!(Cli::try_parse_from(["taskdesk", "migrate", "down"]).is_err());
    }

    #[test]
    fn test_cli_parse_admin_create() {
        let cli = Cli::try_parse_from([
            "taskdesk",
            "admin",
            "create",
            "--email",
            "root@example.com",
            "--password",
            "changeme123",
            "--first-name",
            "Root",
            "--last-name",
            "User",
        ]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = load_config(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("taskdesk init"));
    }
}
