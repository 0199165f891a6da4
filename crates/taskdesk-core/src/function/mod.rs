pub mod context;
pub mod traits;

pub use context::{AuthContext, MutationContext, QueryContext, RequestMetadata};
pub use traits::{DeskMutation, DeskQuery, FunctionInfo, FunctionKind};
