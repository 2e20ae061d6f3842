//! Authentication for the idgate gateway.
//!
//! - [`extract_bearer`] pulls the raw token out of the `Authorization` header.
//! - [`TokenVerifier`] is the seam to the identity provider; [`OidcVerifier`]
//!   checks ID tokens against the provider's JSON Web Key Set.
//! - [`Authenticator`] bounds verification with a deadline and turns the
//!   claims into an [`idgate_core::Identity`].

#![warn(missing_docs)]

mod authenticator;
mod bearer;
mod error;
mod oidc;
mod verifier;

pub use authenticator::{Authenticator, DEFAULT_VERIFY_TIMEOUT};
pub use bearer::extract_bearer;
pub use error::{AuthError, AuthResult};
pub use oidc::{OidcConfig, OidcVerifier};
pub use verifier::{Claims, TokenVerifier};
