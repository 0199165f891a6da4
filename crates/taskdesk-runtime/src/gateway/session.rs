use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use taskdesk_core::function::AuthContext;
use taskdesk_core::model::UserSummary;
use taskdesk_core::ops::users;
use taskdesk_core::{DeskError, Result, Store};

use super::auth::TokenIssuer;
use super::response::{RpcError, RpcResponse};
use super::tracing::TracingState;

/// Shared state of the `/auth` routes.
#[derive(Clone)]
pub struct SessionState {
    pub store: Arc<dyn Store>,
    pub issuer: Arc<TokenIssuer>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: UserSummary,
}

/// Identity carried by a session token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIdentity {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub roles: Vec<String>,
    pub expires_at: i64,
}

/// Verify credentials and sign a session token.
pub async fn login(state: &SessionState, request: LoginRequest) -> Result<LoginResponse> {
    let user = users::authenticate(state.store.as_ref(), &request.email, &request.password).await?;
    let issued = state.issuer.issue(&user).map_err(|e| {
        error!(user_id = %user.id, error = %e, "Failed to sign session token");
        DeskError::Internal(e.to_string())
    })?;

    info!(user_id = %user.id, "User logged in");
    Ok(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: UserSummary::from(user),
    })
}

/// Identity of the caller, or Unauthorized without a valid token.
pub fn session_identity(auth: &AuthContext) -> Result<SessionIdentity> {
    let claims = auth
        .claims()
        .ok_or_else(|| DeskError::Unauthorized("Not signed in".into()))?;
    let id = claims
        .user_id()
        .ok_or_else(|| DeskError::Unauthorized("Invalid session subject".into()))?;

    Ok(SessionIdentity {
        id,
        email: claims.email.clone(),
        first_name: claims.first_name.clone(),
        last_name: claims.last_name.clone(),
        roles: claims.roles.clone(),
        expires_at: claims.exp,
    })
}

fn respond<T: Serialize>(result: Result<T>, tracing: &TracingState) -> RpcResponse {
    let response = match result.and_then(|data| {
        serde_json::to_value(data).map_err(|e| DeskError::Serialization(e.to_string()))
    }) {
        Ok(data) => RpcResponse::success(data),
        Err(e) => RpcResponse::error(RpcError::from(e)),
    };
    response.with_request_id(tracing.request_id.to_string())
}

/// `POST /auth/login`
pub async fn login_handler(
    State(state): State<SessionState>,
    Extension(tracing): Extension<TracingState>,
    Json(request): Json<LoginRequest>,
) -> RpcResponse {
    respond(login(&state, request).await, &tracing)
}

/// `GET /auth/session`
pub async fn session_handler(
    Extension(auth): Extension<AuthContext>,
    Extension(tracing): Extension<TracingState>,
) -> RpcResponse {
    respond(session_identity(&auth), &tracing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::auth::{AuthConfig, AuthMiddleware};
    use taskdesk_core::auth::hash_password;
    use taskdesk_core::model::{NewUser, Role};
    use taskdesk_core::MemoryStore;

    async fn state_with_user(email: &str, password: &str) -> SessionState {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(NewUser {
                email: email.into(),
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                position: "Admiral".into(),
                role: Role::User,
                password_hash: hash_password(password).unwrap(),
            })
            .await
            .unwrap();
        SessionState {
            store,
            issuer: Arc::new(TokenIssuer::new(&AuthConfig::new("session-secret", 600))),
        }
    }

    #[tokio::test]
    async fn test_login_issues_verifiable_token() {
        let state = state_with_user("grace@example.com", "correct-horse").await;
        let response = login(
            &state,
            LoginRequest {
                email: "Grace@Example.com".into(),
                password: "correct-horse".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(response.user.email, "grace@example.com");
        let claims = AuthMiddleware::new(&AuthConfig::new("session-secret", 600))
            .validate_token(&response.token)
            .unwrap();
        assert_eq!(claims.user_id(), Some(response.user.id));
        assert_eq!(claims.exp, response.expires_at);
    }

    #[tokio::test]
    async fn test_login_does_not_reveal_which_part_failed() {
        let state = state_with_user("grace@example.com", "correct-horse").await;

        let wrong_password = login(
            &state,
            LoginRequest {
                email: "grace@example.com".into(),
                password: "wrong-horse".into(),
            },
        )
        .await
        .unwrap_err();
        let unknown_email = login(
            &state,
            LoginRequest {
                email: "nobody@example.com".into(),
                password: "correct-horse".into(),
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(wrong_password, DeskError::Unauthorized(_)));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[test]
    fn test_session_requires_claims() {
        let err = session_identity(&AuthContext::unauthenticated()).unwrap_err();
        assert!(matches!(err, DeskError::Unauthorized(_)));
    }
}
