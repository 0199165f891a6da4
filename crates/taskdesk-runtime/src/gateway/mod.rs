mod auth;
mod request;
mod response;
mod rpc;
mod server;
mod session;
mod tracing;

pub use auth::{auth_middleware, AuthConfig, AuthError, AuthMiddleware, IssuedToken, TokenIssuer};
pub use request::RpcRequest;
pub use response::{RpcError, RpcResponse};
pub use rpc::{rpc_function_handler, rpc_handler, RpcHandler};
pub use server::{GatewayConfig, GatewayServer, HealthResponse};
pub use session::{login, session_identity, LoginRequest, LoginResponse, SessionIdentity, SessionState};
pub use self::tracing::{tracing_middleware, TracingState, REQUEST_ID_HEADER, TRACE_ID_HEADER};
