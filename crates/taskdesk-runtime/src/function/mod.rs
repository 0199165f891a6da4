pub mod catalog;
pub mod executor;
pub mod registry;
pub mod router;

pub use catalog::register_all;
pub use executor::{ExecutionResult, FunctionExecutor};
pub use registry::{FunctionEntry, FunctionRegistry};
pub use router::{FunctionRouter, RouteResult};
