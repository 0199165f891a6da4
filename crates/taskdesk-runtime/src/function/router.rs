use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use taskdesk_core::{
    AuthContext, DeskError, FunctionInfo, FunctionKind, MutationContext, QueryContext,
    RequestMetadata, Result, Store,
};

use super::registry::{FunctionEntry, FunctionRegistry};

pub enum RouteResult {
    Query(Value),
    Mutation(Value),
}

/// Looks up functions, applies the access gate and runs them against the store.
pub struct FunctionRouter {
    registry: Arc<FunctionRegistry>,
    store: Arc<dyn Store>,
}

impl FunctionRouter {
    pub fn new(registry: Arc<FunctionRegistry>, store: Arc<dyn Store>) -> Self {
        Self { registry, store }
    }

    /// Route and execute a function call. Anonymous calls to protected
    /// functions are rejected before the store is consulted. Signed-in
    /// callers are checked against their stored account, not the roles
    /// frozen into the token.
    pub async fn route(
        &self,
        function_name: &str,
        args: Value,
        auth: AuthContext,
        request: RequestMetadata,
    ) -> Result<RouteResult> {
        let entry = self.registry.get(function_name).ok_or_else(|| {
            DeskError::NotFound(format!("Function '{}' not found", function_name))
        })?;

        let auth = match self.current_caller(entry.info(), auth).await {
            Ok(auth) => auth,
            Err(e) => {
                debug!(function = function_name, error = %e, "Caller rejected");
                return Err(e);
            }
        };

        if let Err(e) = check_access(entry.info(), &auth) {
            debug!(function = function_name, error = %e, "Call rejected by access gate");
            return Err(e);
        }

        match entry {
            FunctionEntry::Query { handler, .. } => {
                let ctx = QueryContext::new(self.store.clone(), auth, request);
                Ok(RouteResult::Query(handler(&ctx, args).await?))
            }
            FunctionEntry::Mutation { handler, .. } => {
                let ctx = MutationContext::new(self.store.clone(), auth, request);
                Ok(RouteResult::Mutation(handler(&ctx, args).await?))
            }
        }
    }

    /// Reload a signed-in caller so demotions and deletions apply at once.
    async fn current_caller(&self, info: &FunctionInfo, auth: AuthContext) -> Result<AuthContext> {
        if info.is_public {
            return Ok(auth);
        }
        // Anonymous callers go straight to the gate.
        let Some(user_id) = auth.user_id() else {
            return Ok(auth);
        };
        match self.store.get_user(user_id).await? {
            Some(user) => Ok(auth.with_current_role(user.role)),
            None => Err(DeskError::Unauthorized("Account no longer exists".into())),
        }
    }

    pub fn info(&self, function_name: &str) -> Option<&FunctionInfo> {
        self.registry.get(function_name).map(|e| e.info())
    }

    pub fn get_function_kind(&self, function_name: &str) -> Option<FunctionKind> {
        self.registry.get(function_name).map(|e| e.kind())
    }

    pub fn has_function(&self, function_name: &str) -> bool {
        self.registry.get(function_name).is_some()
    }
}

/// Access gate: public functions pass, others need a session, and a declared
/// role must be held by the caller.
pub fn check_access(info: &FunctionInfo, auth: &AuthContext) -> Result<()> {
    if info.is_public {
        return Ok(());
    }

    if info.requires_auth && !auth.is_authenticated() {
        return Err(DeskError::Unauthorized("Authentication required".into()));
    }

    if let Some(role) = info.required_role {
        if !auth.has_role(role) {
            return Err(DeskError::Forbidden(format!("Role '{}' required", role)));
        }
    }

    Ok(())
}
