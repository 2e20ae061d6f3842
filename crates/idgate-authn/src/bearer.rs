//! Bearer token extraction.

use http::header::AUTHORIZATION;
use http::HeaderMap;

use crate::error::{AuthError, AuthResult};

/// Extracts the raw token from an `Authorization: Bearer <token>` header.
///
/// The header must hold exactly two space-separated parts and the scheme
/// is matched case-insensitively. The token is returned unmodified.
///
/// # Example
///
/// ```
/// use http::{HeaderMap, HeaderValue};
/// use idgate_authn::extract_bearer;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
/// assert_eq!(extract_bearer(&headers).unwrap(), "abc.def.ghi");
/// ```
pub fn extract_bearer(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?
        .to_str()
        .map_err(|_| AuthError::MalformedCredential)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::MalformedCredential),
    }
}
