use std::sync::Arc;

use uuid::Uuid;

use crate::auth::Claims;
use crate::error::{DeskError, Result};
use crate::model::Role;
use crate::store::Store;

/// Who is calling. Built from a verified session token, or empty.
#[derive(Debug, Clone)]
pub struct AuthContext {
    user_id: Option<Uuid>,
    roles: Vec<String>,
    claims: Option<Claims>,
}

impl AuthContext {
    pub fn unauthenticated() -> Self {
        Self {
            user_id: None,
            roles: Vec::new(),
            claims: None,
        }
    }

    pub fn authenticated(user_id: Uuid, roles: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id),
            roles,
            claims: None,
        }
    }

    /// Context for verified claims. A subject that is not a UUID yields an
    /// unauthenticated context.
    pub fn from_claims(claims: Claims) -> Self {
        match claims.user_id() {
            Some(user_id) => Self {
                user_id: Some(user_id),
                roles: claims.roles.clone(),
                claims: Some(claims),
            },
            None => Self::unauthenticated(),
        }
    }

    /// Replace the token's roles with the account's current role.
    pub fn with_current_role(self, role: Role) -> Self {
        Self {
            roles: vec![role.as_str().to_string()],
            ..self
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn require_user_id(&self) -> Result<Uuid> {
        self.user_id
            .ok_or_else(|| DeskError::Unauthorized("Authentication required".into()))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn require_role(&self, role: &str) -> Result<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(DeskError::Forbidden(format!(
                "Required role '{}' not present",
                role
            )))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin.as_str())
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }
}

/// Request metadata available to all functions.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub request_id: Uuid,
    pub trace_id: String,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4().to_string())
    }

    pub fn with_trace_id(trace_id: String) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            trace_id,
            client_ip: None,
            user_agent: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handed to query functions.
pub struct QueryContext {
    pub auth: AuthContext,
    pub request: RequestMetadata,
    store: Arc<dyn Store>,
}

impl QueryContext {
    pub fn new(store: Arc<dyn Store>, auth: AuthContext, request: RequestMetadata) -> Self {
        Self {
            auth,
            request,
            store,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn require_user_id(&self) -> Result<Uuid> {
        self.auth.require_user_id()
    }
}

/// Context handed to mutation functions.
pub struct MutationContext {
    pub auth: AuthContext,
    pub request: RequestMetadata,
    store: Arc<dyn Store>,
}

impl MutationContext {
    pub fn new(store: Arc<dyn Store>, auth: AuthContext, request: RequestMetadata) -> Self {
        Self {
            auth,
            request,
            store,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn require_user_id(&self) -> Result<Uuid> {
        self.auth.require_user_id()
    }
}
