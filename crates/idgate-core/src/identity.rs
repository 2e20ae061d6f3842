//! Caller identity.

use serde::{Deserialize, Serialize};

/// The authenticated caller, built from verified token claims.
///
/// An `Identity` lives for one request. It is written by the
/// authentication stage and read by the authorization stage.
///
/// # Example
///
/// ```
/// use idgate_core::Identity;
///
/// let identity = Identity::new("alice@example.com", vec!["admins".to_string()]);
/// assert_eq!(identity.email(), "alice@example.com");
/// assert!(identity.in_group("admins"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    email: String,
    #[serde(default)]
    groups: Vec<String>,
}

impl Identity {
    /// Creates a new identity.
    #[must_use]
    pub fn new(email: impl Into<String>, groups: Vec<String>) -> Self {
        Self {
            email: email.into(),
            groups,
        }
    }

    /// Returns the verified email address of the caller.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the groups asserted by the identity provider.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Returns true if the caller belongs to `group`.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_accessors() {
        let identity = Identity::new("bob@example.com", vec![]);
        assert_eq!(identity.email(), "bob@example.com");
        assert!(identity.groups().is_empty());
        assert!(!identity.in_group("admins"));
    }

    #[test]
    fn test_identity_display() {
        let identity = Identity::new("bob@example.com", vec![]);
        assert_eq!(identity.to_string(), "user:bob@example.com");
    }
}
