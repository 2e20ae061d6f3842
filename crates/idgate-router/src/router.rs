//! High-level router API.

use http::Method;

use crate::method_router::MethodRouter;
use crate::node::Node;
use crate::RouteMatch;

/// Outcome of resolving a request against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// A route accepts this method and path.
    Matched(RouteMatch<'a>),
    /// The path exists but not for this method.
    MethodNotAllowed(Vec<Method>),
    /// No route matches the path.
    NotFound,
}

/// Radix tree router.
///
/// Priority when several routes could match: static segments first, then
/// parameters. A static branch that has no route for the requested method
/// falls back to the parameter branch.
#[derive(Debug, Clone)]
pub struct Router {
    root: Node,
    route_count: usize,
    prefix: String,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Creates an empty router that mounts every route under `prefix`.
    ///
    /// The prefix is part of the reported template.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            root: Node::root(),
            route_count: 0,
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Returns the mount prefix, without a trailing slash.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Inserts a route.
    pub fn insert(&mut self, path: &str, methods: MethodRouter) {
        let template = format!("{}{}", self.prefix, path);
        self.root.insert(&template, methods);
        self.route_count += 1;
    }

    /// Adds a single-method route.
    pub fn route(&mut self, method: &Method, path: &str, operation_id: impl Into<String>) {
        self.insert(path, MethodRouter::new().method(method, operation_id));
    }

    /// Matches a method and path.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let (methods, template, params) = self.root.match_route(method, path)?;
        let operation_id = methods.get_operation(method)?;
        Some(RouteMatch::new(operation_id, template, params))
    }

    /// Resolves a request into a match, a 405 or a 404.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        if let Some(m) = self.match_route(method, path) {
            return Resolution::Matched(m);
        }
        match self.root.match_path(path) {
            Some((methods, _, _)) => Resolution::MethodNotAllowed(methods.allowed_methods()),
            None => Resolution::NotFound,
        }
    }

    /// Returns the number of routes registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.route_count
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }
}
