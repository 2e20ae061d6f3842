//! Error types for the authorization crate.

use std::time::Duration;

use idgate_core::GatewayError;
use thiserror::Error;

/// Result type for authorization operations.
pub type AuthzResult<T> = Result<T, AuthzError>;

/// Errors that can occur during authorization.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthzError {
    /// The role-binding lookup failed.
    #[error("failed to list cluster role bindings: {0}")]
    Lookup(String),

    /// The role-binding lookup did not answer in time.
    #[error("role binding lookup timed out after {0:?}")]
    Timeout(Duration),

    /// The cluster client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Creates a lookup error.
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<reqwest::Error> for AuthzError {
    fn from(err: reqwest::Error) -> Self {
        Self::Lookup(err.to_string())
    }
}

impl From<AuthzError> for GatewayError {
    fn from(err: AuthzError) -> Self {
        GatewayError::lookup_failed(err.to_string())
    }
}
