use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use taskdesk_core::model::{Role, User};
use taskdesk_core::ops::users::{create_account, AccountInput};
use taskdesk_core::Store;
use taskdesk_runtime::migrations::MigrationRunner;
use taskdesk_runtime::{Database, PgStore};

use super::{load_config, DEFAULT_CONFIG};

/// Minimum password length for bootstrap admins.
const ADMIN_PASSWORD_MIN: usize = 8;

/// Manage administrator accounts.
#[derive(Parser)]
pub struct AdminCommand {
    #[command(subcommand)]
    pub action: AdminAction,

    /// Configuration file path.
    #[arg(short, long, default_value = DEFAULT_CONFIG, global = true)]
    pub config: String,
}

#[derive(Subcommand)]
pub enum AdminAction {
    /// Create an ADMIN account.
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        position: Option<String>,
    },
}

impl AdminCommand {
    pub async fn execute(self) -> Result<()> {
        let config = load_config(&self.config)?;
        let db = Database::from_config(&config.database).await?;
        MigrationRunner::new(db.pool().clone()).run(Vec::new()).await?;
        let store = PgStore::new(db.pool().clone());

        let result = match self.action {
            AdminAction::Create {
                email,
                password,
                first_name,
                last_name,
                position,
            } => {
                let input = AccountInput {
                    email,
                    password,
                    first_name,
                    last_name,
                    position,
                    role: None,
                };
                create_admin(&store, input).await
            }
        };
        db.close().await;

        let user = result?;
        println!(
            "  {} Created admin {} ({})",
            style("✓").green(),
            style(&user.email).cyan(),
            user.id
        );
        Ok(())
    }
}

async fn create_admin(store: &dyn Store, input: AccountInput) -> Result<User> {
    Ok(create_account(store, input, Role::Admin, ADMIN_PASSWORD_MIN).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_core::{DeskError, MemoryStore};

    fn input(email: &str, password: &str) -> AccountInput {
        AccountInput {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Root".to_string(),
            last_name: "Admin".to_string(),
            position: None,
            role: None,
        }
    }

    #[tokio::test]
    async fn test_create_admin_assigns_admin_role() {
        let store = MemoryStore::new();
        let user = create_admin(&store, input("root@example.com", "long-password"))
            .await
            .unwrap();
        assert_eq!(user.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_create_admin_rejects_short_password() {
        let store = MemoryStore::new();
        let err = create_admin(&store, input("root@example.com", "short"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeskError>(),
            Some(DeskError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_admin_conflicts_on_duplicate() {
        let store = MemoryStore::new();
        create_admin(&store, input("root@example.com", "long-password"))
            .await
            .unwrap();
        let err = create_admin(&store, input("ROOT@example.com", "long-password"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeskError>(),
            Some(DeskError::Conflict(_))
        ));
    }
}
