//! Test support: assertion macros, context builders over the in-memory
//! store, seed fixtures, and opt-in PostgreSQL databases.

pub mod assertions;
pub mod context;
pub mod db;
pub mod fixtures;

pub use context::TestContext;
pub use db::{IsolatedTestDb, TestDatabase, TEST_DATABASE_ENV};
pub use fixtures::{seed_project, seed_task, seed_user, UNUSABLE_HASH};
