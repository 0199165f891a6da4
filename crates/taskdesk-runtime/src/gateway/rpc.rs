use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::{header::USER_AGENT, HeaderMap},
    Json,
};
use serde_json::Value;

use taskdesk_core::function::{AuthContext, RequestMetadata};
use taskdesk_core::Store;

use super::request::RpcRequest;
use super::response::{RpcError, RpcResponse};
use super::tracing::TracingState;
use crate::function::{FunctionExecutor, FunctionRegistry};

/// Dispatches RPC calls to the function executor.
#[derive(Clone)]
pub struct RpcHandler {
    executor: Arc<FunctionExecutor>,
}

impl RpcHandler {
    /// Handler over `registry`, with calls cut off after `function_timeout`.
    pub fn new(
        registry: Arc<FunctionRegistry>,
        store: Arc<dyn Store>,
        function_timeout: Duration,
    ) -> Self {
        Self {
            executor: Arc::new(FunctionExecutor::new(registry, store, function_timeout)),
        }
    }

    /// Run one call. Failures come back as an error body, never a panic or
    /// a dropped request.
    pub async fn handle(
        &self,
        request: RpcRequest,
        auth: AuthContext,
        metadata: RequestMetadata,
    ) -> RpcResponse {
        let request_id = metadata.request_id.to_string();

        if !self.executor.has_function(&request.function) {
            return RpcResponse::error(RpcError::not_found(format!(
                "Function '{}' not found",
                request.function
            )))
            .with_request_id(request_id);
        }

        match self
            .executor
            .execute(&request.function, request.args, auth, metadata)
            .await
        {
            Ok(result) => RpcResponse::success(result.result),
            Err(e) => RpcResponse::error(RpcError::from(e)),
        }
        .with_request_id(request_id)
    }
}

/// Request metadata from the tracing ids and client headers.
pub(crate) fn request_metadata(tracing: TracingState, headers: &HeaderMap) -> RequestMetadata {
    let mut metadata = RequestMetadata::with_trace_id(tracing.trace_id);
    metadata.request_id = tracing.request_id;
    metadata.user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    metadata.client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string());
    metadata
}

/// `POST /rpc` with `{function, args}`.
pub async fn rpc_handler(
    State(handler): State<Arc<RpcHandler>>,
    Extension(auth): Extension<AuthContext>,
    Extension(tracing): Extension<TracingState>,
    headers: HeaderMap,
    Json(request): Json<RpcRequest>,
) -> RpcResponse {
    let metadata = request_metadata(tracing, &headers);
    handler.handle(request, auth, metadata).await
}

/// `POST /rpc/{function}` with the args as the body. An empty body means `{}`.
pub async fn rpc_function_handler(
    State(handler): State<Arc<RpcHandler>>,
    Extension(auth): Extension<AuthContext>,
    Extension(tracing): Extension<TracingState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> RpcResponse {
    let metadata = request_metadata(tracing, &headers);

    let args = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(args) => args,
            Err(e) => {
                return RpcResponse::error(RpcError::validation(format!(
                    "Request body is not valid JSON: {}",
                    e
                )))
                .with_request_id(metadata.request_id.to_string())
            }
        }
    };

    handler
        .handle(RpcRequest::new(function, args), auth, metadata)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_core::MemoryStore;

    fn handler() -> RpcHandler {
        let mut registry = FunctionRegistry::new();
        crate::function::register_all(&mut registry);
        RpcHandler::new(
            Arc::new(registry),
            Arc::new(MemoryStore::new()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_handle_unknown_function() {
        let metadata = RequestMetadata::new();
        let expected_id = metadata.request_id.to_string();
        let response = handler()
            .handle(
                RpcRequest::new("unknown_function", serde_json::json!({})),
                AuthContext::unauthenticated(),
                metadata,
            )
            .await;

        assert!(!response.success);
        assert_eq!(response.error.as_ref().unwrap().code, "NOT_FOUND");
        assert_eq!(response.request_id, Some(expected_id));
    }

    #[tokio::test]
    async fn test_handle_keeps_error_code() {
        let response = handler()
            .handle(
                RpcRequest::new("list_tickets", Value::Null),
                AuthContext::unauthenticated(),
                RequestMetadata::new(),
            )
            .await;
        assert_eq!(response.error.unwrap().code, "UNAUTHORIZED");
    }

    #[test]
    fn test_request_metadata_reads_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, "taskdesk-tests".parse().unwrap());
        headers.insert("x-forwarded-for", "10.0.0.7, 10.0.0.1".parse().unwrap());
        let tracing = TracingState::with_trace_id("trace-9".into());
        let request_id = tracing.request_id;

        let metadata = request_metadata(tracing, &headers);
        assert_eq!(metadata.trace_id, "trace-9");
        assert_eq!(metadata.request_id, request_id);
        assert_eq!(metadata.user_agent.as_deref(), Some("taskdesk-tests"));
        assert_eq!(metadata.client_ip.as_deref(), Some("10.0.0.7"));
    }
}
