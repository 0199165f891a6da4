//! PostgreSQL store, migrations, function dispatch and the HTTP gateway.

pub mod db;
pub mod function;
pub mod gateway;
pub mod migrations;
pub mod store;

pub use db::Database;
pub use function::{
    register_all, FunctionExecutor, FunctionRegistry, FunctionRouter, RouteResult,
};
pub use gateway::{
    AuthConfig, AuthMiddleware, GatewayConfig, GatewayServer, RpcError, RpcHandler, RpcRequest,
    RpcResponse, TokenIssuer, TracingState,
};
pub use migrations::{builtin_migrations, Migration, MigrationRunner, MigrationStatus};
pub use store::PgStore;
