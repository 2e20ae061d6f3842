//! Turns a bearer token into a caller identity.

use std::sync::Arc;
use std::time::Duration;

use idgate_core::Identity;

use crate::error::{AuthError, AuthResult};
use crate::verifier::TokenVerifier;

/// Default deadline for a single verification.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Verifies tokens and checks that the caller's email is verified.
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn TokenVerifier>,
    timeout: Duration,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Creates an authenticator over `verifier`.
    pub fn new(verifier: Arc<dyn TokenVerifier>, timeout: Duration) -> Self {
        Self { verifier, timeout }
    }

    /// Verifies `token` and builds the caller identity.
    ///
    /// A verifier that does not answer within the deadline counts as an
    /// invalid credential.
    pub async fn authenticate(&self, token: &str) -> AuthResult<Identity> {
        let claims = tokio::time::timeout(self.timeout, self.verifier.verify(token))
            .await
            .map_err(|_| AuthError::invalid("token verification timed out"))??;

        if !claims.email_verified {
            return Err(AuthError::UnverifiedIdentity {
                email: claims.email,
            });
        }

        Ok(Identity::new(claims.email, claims.groups))
    }
}
