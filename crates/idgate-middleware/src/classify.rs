//! Request classification.
//!
//! Only the method and the suffix of the matched path template are
//! inspected, so the same rules hold whatever prefix the routes are
//! mounted under.

use http::Method;
use idgate_core::RequestKind;

const CREATE_SUFFIX: &str = "/users";
const UPDATE_SUFFIXES: [&str; 2] = ["/users/{email}", "/users/{email=*}"];

/// Classifies a request by method and matched path template.
///
/// # Example
///
/// ```
/// use http::Method;
/// use idgate_core::RequestKind;
/// use idgate_middleware::classify;
///
/// assert_eq!(classify(&Method::POST, "/api/v1/users"), RequestKind::CreateUser);
/// assert_eq!(classify(&Method::PUT, "/api/v1/users/{email=*}"), RequestKind::UpdateUser);
/// assert_eq!(classify(&Method::GET, "/api/v1/users"), RequestKind::Other);
/// ```
pub fn classify(method: &Method, template: &str) -> RequestKind {
    if *method == Method::POST && template.ends_with(CREATE_SUFFIX) {
        RequestKind::CreateUser
    } else if *method == Method::PUT && UPDATE_SUFFIXES.iter().any(|s| template.ends_with(s)) {
        RequestKind::UpdateUser
    } else {
        RequestKind::Other
    }
}
