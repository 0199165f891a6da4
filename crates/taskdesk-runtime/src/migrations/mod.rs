mod builtin;
mod runner;

pub use builtin::builtin_migrations;
pub use runner::{
    load_migrations_from_dir, AppliedMigration, Migration, MigrationRunner, MigrationStatus,
};
