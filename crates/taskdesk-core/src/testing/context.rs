//! Builders for function contexts over a [`MemoryStore`].

use std::sync::Arc;

use uuid::Uuid;

use crate::function::{AuthContext, MutationContext, QueryContext, RequestMetadata};
use crate::store::{MemoryStore, Store};

/// Builds query and mutation contexts for a caller.
///
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let ctx = TestContext::new(store.clone()).as_user(admin.id).with_role("ADMIN");
/// CreateProject::execute(&ctx.mutation(), input).await?;
/// ```
#[derive(Clone)]
pub struct TestContext {
    store: Arc<MemoryStore>,
    user_id: Option<Uuid>,
    roles: Vec<String>,
}

impl TestContext {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            user_id: None,
            roles: Vec::new(),
        }
    }

    pub fn as_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn auth(&self) -> AuthContext {
        match self.user_id {
            Some(id) => AuthContext::authenticated(id, self.roles.clone()),
            None => AuthContext::unauthenticated(),
        }
    }

    pub fn query(&self) -> QueryContext {
        QueryContext::new(self.shared_store(), self.auth(), RequestMetadata::new())
    }

    pub fn mutation(&self) -> MutationContext {
        MutationContext::new(self.shared_store(), self.auth(), RequestMetadata::new())
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    fn shared_store(&self) -> Arc<dyn Store> {
        self.store.clone()
    }
}
