use std::future::Future;
use std::pin::Pin;

use serde::{de::DeserializeOwned, Serialize};

use super::context::{MutationContext, QueryContext};
use crate::error::Result;
use crate::model::Role;

/// Information about a registered function.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Function name (used for routing).
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub kind: FunctionKind,
    pub requires_auth: bool,
    /// Role the caller must hold, checked before the function runs.
    pub required_role: Option<&'static str>,
    /// Callable without a session.
    pub is_public: bool,
    /// Per-function timeout override in seconds.
    pub timeout: Option<u64>,
}

impl FunctionInfo {
    pub fn query(name: &'static str) -> Self {
        Self::new(name, FunctionKind::Query)
    }

    pub fn mutation(name: &'static str) -> Self {
        Self::new(name, FunctionKind::Mutation)
    }

    fn new(name: &'static str, kind: FunctionKind) -> Self {
        Self {
            name,
            description: None,
            kind,
            requires_auth: true,
            required_role: None,
            is_public: false,
            timeout: None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn admin_only(mut self) -> Self {
        self.required_role = Some(Role::Admin.as_str());
        self
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self.requires_auth = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Query,
    Mutation,
}

impl std::fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionKind::Query => write!(f, "query"),
            FunctionKind::Mutation => write!(f, "mutation"),
        }
    }
}

/// A read-only function.
pub trait DeskQuery: Send + Sync + 'static {
    type Args: DeserializeOwned + Send + Sync;
    type Output: Serialize + Send;

    fn info() -> FunctionInfo;

    fn execute(
        ctx: &QueryContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>>;
}

/// A function that writes. Multi-row writes are atomic inside the store.
pub trait DeskMutation: Send + Sync + 'static {
    type Args: DeserializeOwned + Send + Sync;
    type Output: Serialize + Send;

    fn info() -> FunctionInfo;

    fn execute(
        ctx: &MutationContext,
        args: Self::Args,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_kind_display() {
        assert_eq!(FunctionKind::Query.to_string(), "query");
        assert_eq!(FunctionKind::Mutation.to_string(), "mutation");
    }

    #[test]
    fn test_info_builders() {
        let info = FunctionInfo::mutation("delete_project").admin_only();
        assert_eq!(info.kind, FunctionKind::Mutation);
        assert!(info.requires_auth);
        assert_eq!(info.required_role, Some("ADMIN"));

        let info = FunctionInfo::mutation("register").public();
        assert!(info.is_public);
        assert!(!info.requires_auth);
        assert!(info.required_role.is_none());
    }
}
