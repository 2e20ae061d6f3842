//! Role bindings and the role allow-list.

use std::collections::BTreeSet;

/// Subject kind for human users.
pub const USER_KIND: &str = "User";
/// Subject kind for service accounts.
pub const SERVICE_ACCOUNT_KIND: &str = "ServiceAccount";

/// One subject bound to one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBinding {
    /// Subject kind (`User`, `ServiceAccount`, `Group`, ...).
    pub subject_kind: String,
    /// Subject name.
    pub subject_name: String,
    /// Name of the bound role.
    pub role_name: String,
}

impl RoleBinding {
    /// Creates a binding.
    pub fn new(
        subject_kind: impl Into<String>,
        subject_name: impl Into<String>,
        role_name: impl Into<String>,
    ) -> Self {
        Self {
            subject_kind: subject_kind.into(),
            subject_name: subject_name.into(),
            role_name: role_name.into(),
        }
    }

    /// Returns true if this binding grants its role to the caller `email`.
    ///
    /// Only user and service-account subjects count; group subjects do not.
    pub fn grants(&self, email: &str) -> bool {
        (self.subject_kind == USER_KIND || self.subject_kind == SERVICE_ACCOUNT_KIND)
            && self.subject_name == email
    }
}

/// Roles that may use the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAllowList {
    roles: BTreeSet<String>,
}

impl Default for RoleAllowList {
    fn default() -> Self {
        Self::new(["cluster-admin"])
    }
}

impl RoleAllowList {
    /// Creates an allow-list from role names.
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `role` is allowed.
    pub fn contains(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if any of `roles` is allowed.
    pub fn permits<'a>(&self, roles: impl IntoIterator<Item = &'a str>) -> bool {
        roles.into_iter().any(|role| self.contains(role))
    }

    /// Iterates over the allowed roles in name order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    /// Returns true if no role is allowed.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
