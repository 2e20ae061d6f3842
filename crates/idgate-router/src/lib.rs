//! Radix tree router for the idgate gateway.
//!
//! Routes are registered as path templates such as `/v1/users/{email}`.
//! A successful match reports the operation, the template it matched and
//! the extracted path parameters. The template is what the request
//! classifier inspects, so it is kept exactly as registered.
//!
//! Parameters may be written `{name}` or in the gateway style `{name=*}`;
//! both bind a single path segment.
//!
//! # Example
//!
//! ```rust
//! use idgate_router::{MethodRouter, Resolution, Router};
//! use http::Method;
//!
//! let mut router = Router::with_prefix("/api");
//! router.insert("/v1/users", MethodRouter::new().get("ListPasswords").post("CreatePassword"));
//! router.insert("/v1/users/{email=*}", MethodRouter::new().put("UpdatePassword"));
//!
//! let m = router.match_route(&Method::PUT, "/api/v1/users/alice").unwrap();
//! assert_eq!(m.operation_id, "UpdatePassword");
//! assert_eq!(m.template, "/api/v1/users/{email=*}");
//! assert_eq!(m.params.get("email"), Some("alice"));
//!
//! assert!(matches!(
//!     router.resolve(&Method::DELETE, "/api/v1/users"),
//!     Resolution::MethodNotAllowed(_)
//! ));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!                    "api"
//!                      │
//!                     "v1"
//!                      │
//!                   "users"  [GET, POST]
//!                      │
//!               ┌──────┴──────┐
//!            "verify"    "{email=*}"
//!             [POST]     [PUT, DELETE]
//! ```

mod method_router;
mod node;
mod params;
mod router;

pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::{Resolution, Router};

/// A matched route with its operation ID, template and extracted parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    /// The operation ID for the matched route
    pub operation_id: &'a str,
    /// The path template the request matched, as registered
    pub template: &'a str,
    /// Extracted path parameters
    pub params: Params,
}

impl<'a> RouteMatch<'a> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(operation_id: &'a str, template: &'a str, params: Params) -> Self {
        Self {
            operation_id,
            template,
            params,
        }
    }
}
