//! Per-request pipeline context.
//!
//! The [`GatewayContext`] is created when a request arrives and dropped when
//! its response is sent. It is never shared between requests.

use http::Method;
use idgate_core::{Identity, RequestId, RequestKind};
use idgate_router::{Params, RouteMatch};
use std::time::{Duration, Instant};

use crate::classify::classify;

/// The route a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    /// Backend operation name.
    pub operation_id: String,
    /// Path template, as registered.
    pub template: String,
    /// Path parameters, percent-decoded.
    pub params: Params,
}

impl RouteInfo {
    /// Creates route info from its parts.
    pub fn new(operation_id: impl Into<String>, template: impl Into<String>, params: Params) -> Self {
        Self {
            operation_id: operation_id.into(),
            template: template.into(),
            params,
        }
    }
}

impl From<RouteMatch<'_>> for RouteInfo {
    fn from(m: RouteMatch<'_>) -> Self {
        // values that do not decode to UTF-8 are kept as sent
        let params = m
            .params
            .iter()
            .map(|(name, value)| {
                let decoded = urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string());
                (name.to_string(), decoded)
            })
            .collect();
        Self::new(m.operation_id, m.template, params)
    }
}

/// State that flows through the pipeline for one request.
///
/// # Example
///
/// ```
/// use idgate_core::Identity;
/// use idgate_middleware::GatewayContext;
///
/// let mut ctx = GatewayContext::new();
/// assert!(ctx.identity().is_none());
///
/// ctx.set_identity(Identity::new("alice@example.com", vec![]));
/// assert_eq!(ctx.identity().unwrap().email(), "alice@example.com");
/// ```
#[derive(Debug)]
pub struct GatewayContext {
    request_id: RequestId,
    /// Set by the authentication stage.
    identity: Option<Identity>,
    route: Option<RouteInfo>,
    started_at: Instant,
}

impl GatewayContext {
    /// Creates a context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            identity: None,
            route: None,
            started_at: Instant::now(),
        }
    }

    /// Attaches the resolved route.
    #[must_use]
    pub fn with_route(mut self, route: RouteInfo) -> Self {
        self.route = Some(route);
        self
    }

    /// Returns the request ID.
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the caller identity, if authentication ran and succeeded.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Sets the caller identity.
    pub fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }

    /// Returns the resolved route.
    pub fn route(&self) -> Option<&RouteInfo> {
        self.route.as_ref()
    }

    /// Sets the resolved route.
    pub fn set_route(&mut self, route: RouteInfo) {
        self.route = Some(route);
    }

    /// Returns a path parameter of the resolved route.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.route.as_ref().and_then(|r| r.params.get(name))
    }

    /// Classifies the request against the resolved route.
    ///
    /// Requests without a route are never user mutations.
    pub fn request_kind(&self, method: &Method) -> RequestKind {
        self.route
            .as_ref()
            .map_or(RequestKind::Other, |r| classify(method, &r.template))
    }

    /// Returns when the request started processing.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the time elapsed since the request started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl Default for GatewayContext {
    fn default() -> Self {
        Self::new()
    }
}
