use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request ids, stored in request extensions.
#[derive(Debug, Clone)]
pub struct TracingState {
    /// Propagated from `x-trace-id` when the caller sends one.
    pub trace_id: String,
    pub request_id: Uuid,
    pub start_time: Instant,
}

impl TracingState {
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4().to_string())
    }

    pub fn with_trace_id(trace_id: String) -> Self {
        Self {
            trace_id,
            request_id: Uuid::new_v4(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for TracingState {
    fn default() -> Self {
        Self::new()
    }
}

/// Assign trace and request ids, log the request and echo the ids back as
/// response headers.
pub async fn tracing_middleware(mut req: Request, next: Next) -> Response {
    let state = req
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| TracingState::with_trace_id(v.to_string()))
        .unwrap_or_default();
    req.extensions_mut().insert(state.clone());

    let span = info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        trace_id = %state.trace_id,
        request_id = %state.request_id,
    );

    let mut response = next.run(req).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            duration_ms = state.elapsed().as_millis() as u64,
            "Request completed"
        )
    });

    if let Ok(value) = HeaderValue::from_str(&state.trace_id) {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&state.request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_ids() {
        let state = TracingState::new();
        assert!(!state.trace_id.is_empty());
        assert_ne!(state.request_id, Uuid::nil());
    }

    #[test]
    fn test_trace_id_is_propagated() {
        let a = TracingState::with_trace_id("trace-123".to_string());
        let b = TracingState::with_trace_id("trace-123".to_string());
        assert_eq!(a.trace_id, "trace-123");
        assert_ne!(a.request_id, b.request_id);
    }
}
