//! Request kinds.

use serde::{Deserialize, Serialize};

/// The kinds of request the gateway treats specially.
///
/// Only user creation and user update have their bodies rewritten;
/// everything else passes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// `POST .../users`
    CreateUser,
    /// `PUT .../users/{email}`
    UpdateUser,
    /// Any other route.
    Other,
}

impl RequestKind {
    /// Returns the kind name used in logs and metric labels.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateUser => "create_user",
            Self::UpdateUser => "update_user",
            Self::Other => "other",
        }
    }

    /// Returns true if requests of this kind carry a body that gets rewritten.
    #[must_use]
    pub const fn rewrites_body(self) -> bool {
        matches!(self, Self::CreateUser | Self::UpdateUser)
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
