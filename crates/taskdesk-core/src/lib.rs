pub mod auth;
pub mod config;
pub mod error;
pub mod function;
pub mod model;
pub mod ops;
pub mod stats;
pub mod store;
pub mod testing;
pub mod validate;

pub use auth::{Claims, ClaimsBuilder};
pub use config::DeskConfig;
pub use error::{DeskError, Result};
pub use function::{
    AuthContext, DeskMutation, DeskQuery, FunctionInfo, FunctionKind, MutationContext,
    QueryContext, RequestMetadata,
};
pub use store::{MemoryStore, Store};
