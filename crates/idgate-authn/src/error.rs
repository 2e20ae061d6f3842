//! Error types for authentication.

use idgate_core::GatewayError;
use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Reasons a request fails authentication.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header.
    #[error("authorization header not found")]
    MissingCredential,

    /// The header is not `Bearer <token>`.
    #[error("invalid authorization header format")]
    MalformedCredential,

    /// Signature, expiry or audience check failed, or the verifier timed out.
    #[error("could not verify bearer token: {0}")]
    InvalidCredential(String),

    /// The token is valid but `email_verified` is false.
    #[error("email ({email:?}) in returned claims was not verified")]
    UnverifiedIdentity {
        /// The unverified email.
        email: String,
    },

    /// The signing keys could not be fetched.
    #[error("failed to fetch signing keys: {0}")]
    KeySet(String),
}

impl AuthError {
    /// Creates an invalid credential error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidCredential(message.into())
    }
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => Self::MissingCredential,
            AuthError::MalformedCredential => Self::MalformedCredential,
            AuthError::InvalidCredential(message) => Self::invalid_credential(message),
            AuthError::UnverifiedIdentity { email } => Self::unverified(email),
            // Without keys the token cannot be verified
            err @ AuthError::KeySet(_) => Self::invalid_credential(err.to_string()),
        }
    }
}
