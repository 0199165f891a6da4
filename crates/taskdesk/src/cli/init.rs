use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use console::style;
use uuid::Uuid;

use super::DEFAULT_CONFIG;

/// Write a starter taskdesk.toml.
#[derive(Parser)]
pub struct InitCommand {
    /// Directory to write into.
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Project name (defaults to the directory name).
    #[arg(short, long)]
    pub name: Option<String>,

    /// Overwrite an existing taskdesk.toml.
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn execute(self) -> Result<()> {
        let path = write_config(&self.dir, self.name.as_deref(), self.force)?;
        println!(
            "  {} Wrote {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
        println!(
            "  {} Set DATABASE_URL, then run `taskdesk migrate up`",
            style("→").dim()
        );
        Ok(())
    }
}

fn write_config(dir: &Path, name: Option<&str>, force: bool) -> Result<PathBuf> {
    let path = dir.join(DEFAULT_CONFIG);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    let name = match name {
        Some(name) => name.to_string(),
        None => project_name(dir)?,
    };

    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, render_config(&name, &generate_secret()))?;
    Ok(path)
}

fn project_name(dir: &Path) -> Result<String> {
    let dir = dir.canonicalize()?;
    Ok(dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("taskdesk")
        .to_string())
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn render_config(name: &str, jwt_secret: &str) -> String {
    format!(
        r#"[project]
name = "{name}"

[database]
url = "${{DATABASE_URL}}"
pool_size = 10
auto_migrate = true

[gateway]
host = "0.0.0.0"
port = 8080
request_timeout_secs = 30
cors_origins = []

[function]
timeout_secs = 30

[security.auth]
jwt_secret = "{jwt_secret}"
session_ttl_secs = 86400

[observability.logging]
level = "info"
json_format = false
"#
    )
}
