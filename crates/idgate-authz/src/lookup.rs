//! Role-binding lookup seam.

use async_trait::async_trait;

use crate::binding::RoleBinding;
use crate::error::AuthzResult;

/// Lists the role bindings the authorizer filters by caller.
#[async_trait]
pub trait RoleBindingLookup: Send + Sync + 'static {
    /// Returns every binding as `(subject kind, subject name, role)` triples.
    async fn list_role_bindings(&self) -> AuthzResult<Vec<RoleBinding>>;
}

/// A fixed set of bindings, for tests and static deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleBindings {
    bindings: Vec<RoleBinding>,
}

impl StaticRoleBindings {
    /// Creates a lookup that always returns `bindings`.
    pub fn new(bindings: Vec<RoleBinding>) -> Self {
        Self { bindings }
    }
}

#[async_trait]
impl RoleBindingLookup for StaticRoleBindings {
    async fn list_role_bindings(&self) -> AuthzResult<Vec<RoleBinding>> {
        Ok(self.bindings.clone())
    }
}
