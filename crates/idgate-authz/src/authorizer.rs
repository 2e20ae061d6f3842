//! Decides whether a caller may use the gateway.

use std::sync::Arc;
use std::time::Duration;

use idgate_core::Identity;
use tracing::debug;

use crate::binding::RoleAllowList;
use crate::error::{AuthzError, AuthzResult};
use crate::lookup::RoleBindingLookup;

/// Default deadline for one role-binding lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Checks the caller's bound roles against an allow-list.
#[derive(Clone)]
pub struct Authorizer {
    lookup: Arc<dyn RoleBindingLookup>,
    allow_list: RoleAllowList,
    timeout: Duration,
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorizer")
            .field("allow_list", &self.allow_list)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Authorizer {
    /// Creates an authorizer.
    pub fn new(
        lookup: Arc<dyn RoleBindingLookup>,
        allow_list: RoleAllowList,
        timeout: Duration,
    ) -> Self {
        Self {
            lookup,
            allow_list,
            timeout,
        }
    }

    /// Returns the allow-list.
    pub fn allow_list(&self) -> &RoleAllowList {
        &self.allow_list
    }

    /// Returns the roles bound to `email`, in lookup order.
    pub async fn roles_for(&self, email: &str) -> AuthzResult<Vec<String>> {
        let bindings = tokio::time::timeout(self.timeout, self.lookup.list_role_bindings())
            .await
            .map_err(|_| AuthzError::Timeout(self.timeout))??;

        Ok(bindings
            .into_iter()
            .filter(|binding| binding.grants(email))
            .map(|binding| binding.role_name)
            .collect())
    }

    /// Returns true if the caller holds at least one allowed role.
    pub async fn authorize(&self, identity: &Identity) -> AuthzResult<bool> {
        let roles = self.roles_for(identity.email()).await?;
        let allowed = self.allow_list.permits(roles.iter().map(String::as_str));

        debug!(
            caller = %identity.email(),
            roles = %roles.join(", "),
            allowed,
            "Checked cluster roles"
        );
        Ok(allowed)
    }
}
