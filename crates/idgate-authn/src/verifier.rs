//! Token verifier seam.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AuthResult;

/// Claims the gateway reads from a verified ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    /// Caller email.
    #[serde(default)]
    pub email: String,
    /// Whether the provider has verified the email.
    #[serde(default)]
    pub email_verified: bool,
    /// Groups asserted by the provider.
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Verifies a raw bearer token and returns its claims.
///
/// Implementations are built once at startup and shared across requests.
#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    /// Checks signature, expiry and audience, then decodes the claims.
    async fn verify(&self, token: &str) -> AuthResult<Claims>;
}
