use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use taskdesk_core::DeskError;

/// Response body for RPC and auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    /// `false` exactly when `error` is set.
    pub success: bool,
    /// The function's reply envelope on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    /// Echoes the request id assigned by the tracing layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl RpcResponse {
    /// A 200 response carrying `data`.
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: None,
        }
    }

    /// A failed response; the HTTP status follows the error code.
    pub fn error(error: RpcError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            request_id: None,
        }
    }

    /// Attach the request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl IntoResponse for RpcResponse {
    fn into_response(self) -> Response {
        let status = match &self.error {
            None => StatusCode::OK,
            Some(e) => e.status_code(),
        };
        (status, Json(self)).into_response()
    }
}

/// Machine-readable code plus a message safe to show to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Upper-case code such as `NOT_FOUND` or `VALIDATION_ERROR`.
    pub code: String,
    pub message: String,
}

impl RpcError {
    /// Error with an arbitrary code.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// HTTP status for the code. Unknown codes are 500.
    pub fn status_code(&self) -> StatusCode {
        match self.code.as_str() {
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "VALIDATION_ERROR" | "INVALID_ARGUMENT" => StatusCode::BAD_REQUEST,
            "TIMEOUT" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `NOT_FOUND`, 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    /// `UNAUTHORIZED`, 401.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    /// `VALIDATION_ERROR`, 400.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// `TIMEOUT`, 504.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new("TIMEOUT", message)
    }

    /// `INTERNAL_ERROR`, 500.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

/// Storage and internal failures are reported with a generic message; the
/// details are logged where the error is raised.
impl From<DeskError> for RpcError {
    fn from(err: DeskError) -> Self {
        match err {
            DeskError::NotFound(msg) => Self::not_found(msg),
            DeskError::Conflict(msg) => Self::new("CONFLICT", msg),
            DeskError::Unauthorized(msg) => Self::unauthorized(msg),
            DeskError::Forbidden(msg) => Self::new("FORBIDDEN", msg),
            DeskError::Validation(msg) => Self::validation(msg),
            DeskError::InvalidArgument(msg) => Self::new("INVALID_ARGUMENT", msg),
            DeskError::Timeout(msg) => Self::timeout(msg),
            DeskError::Sql(_) | DeskError::Database(_) => Self::internal("Database error"),
            DeskError::Config(_)
            | DeskError::Serialization(_)
            | DeskError::Io(_)
            | DeskError::Internal(_) => Self::internal("Internal server error"),
        }
    }
}
