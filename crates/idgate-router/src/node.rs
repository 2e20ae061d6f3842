//! Radix tree node implementation.

use http::Method;

use crate::method_router::MethodRouter;
use crate::params::Params;

/// Type of path segment in the radix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static path segment (e.g., "users", "v1")
    Static,
    /// Named parameter (e.g., "{email}", "{email=*}")
    Param(String),
}

/// A node in the radix tree.
///
/// Nodes at route boundaries hold a [`MethodRouter`] and the template the
/// route was registered with.
#[derive(Debug, Clone)]
pub struct Node {
    /// The path segment this node represents
    pub segment: String,

    /// The kind of segment (static or param)
    pub kind: SegmentKind,

    /// Method router for this node (if it's a route endpoint)
    pub methods: Option<MethodRouter>,

    /// Full template of the route ending at this node
    pub template: Option<String>,

    /// Static children, sorted by segment for binary search
    pub static_children: Vec<Node>,

    /// Parameter child (at most one per node)
    pub param_child: Option<Box<Node>>,
}

/// A matched endpoint: its methods, template and bound params.
pub(crate) type Endpoint<'a> = (&'a MethodRouter, &'a str, Params);

impl Node {
    /// Creates a new static node.
    #[must_use]
    pub fn new_static(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            kind: SegmentKind::Static,
            methods: None,
            template: None,
            static_children: Vec::new(),
            param_child: None,
        }
    }

    /// Creates a new parameter node.
    ///
    /// `segment` is the spelling used in the template, `name` the bound name.
    #[must_use]
    pub fn new_param(segment: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            kind: SegmentKind::Param(name.into()),
            methods: None,
            template: None,
            static_children: Vec::new(),
            param_child: None,
        }
    }

    /// Creates a root node for the tree.
    #[must_use]
    pub fn root() -> Self {
        Self::new_static("")
    }

    /// Inserts a route into the tree.
    ///
    /// `path` is both the pattern and the template reported on match.
    pub fn insert(&mut self, path: &str, methods: MethodRouter) {
        let segments = Self::parse_path(path);
        self.insert_segments(&segments, path, methods);
    }

    /// Parses a template into segments.
    ///
    /// `{name}` and `{name=*}` both produce a parameter named `name`.
    pub(crate) fn parse_path(path: &str) -> Vec<(String, SegmentKind)> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(inner) => {
                        let name = inner.split_once('=').map_or(inner, |(name, _)| name);
                        (s.to_string(), SegmentKind::Param(name.to_string()))
                    }
                    None => (s.to_string(), SegmentKind::Static),
                }
            })
            .collect()
    }

    fn insert_segments(
        &mut self,
        segments: &[(String, SegmentKind)],
        template: &str,
        methods: MethodRouter,
    ) {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            // Target node: merge methods, first template wins
            if let Some(existing) = &mut self.methods {
                existing.merge(methods);
            } else {
                self.methods = Some(methods);
            }
            if self.template.is_none() {
                self.template = Some(template.to_string());
            }
            return;
        };

        match kind {
            SegmentKind::Static => {
                match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(i) => self.static_children[i].insert_segments(remaining, template, methods),
                    Err(i) => {
                        let mut child = Node::new_static(segment);
                        child.insert_segments(remaining, template, methods);
                        self.static_children.insert(i, child);
                    }
                }
            }
            SegmentKind::Param(name) => {
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Node::new_param(segment, name)));
                child.insert_segments(remaining, template, methods);
            }
        }
    }

    /// Matches a path, requiring the endpoint to accept `method`.
    ///
    /// Static children are tried first; when a static branch has no route
    /// for the method the parameter branch is tried instead.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<Endpoint<'_>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        self.match_segments(&segments, &mut params, &|m: &MethodRouter| m.get_operation(method).is_some())
    }

    /// Matches a path regardless of method.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<Endpoint<'_>> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        self.match_segments(&segments, &mut params, &MethodRouter::has_any_method)
    }

    fn match_segments<'a>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
        accept: &dyn Fn(&MethodRouter) -> bool,
    ) -> Option<Endpoint<'a>> {
        let Some((segment, remaining)) = segments.split_first() else {
            let methods = self.methods.as_ref().filter(|m| accept(m))?;
            let template = self.template.as_deref().unwrap_or_default();
            return Some((methods, template, params.clone()));
        };

        if let Some(child) = self.find_static_child(segment) {
            if let Some(result) = child.match_segments(remaining, params, accept) {
                return Some(result);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), (*segment).to_string());
                if let Some(result) = child.match_segments(remaining, params, accept) {
                    return Some(result);
                }
                params.truncate(mark);
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Node> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_plain_param() {
        let segments = Node::parse_path("/users/{email}");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], ("users".to_string(), SegmentKind::Static));
        assert_eq!(
            segments[1],
            ("{email}".to_string(), SegmentKind::Param("email".to_string()))
        );
    }

    #[test]
    fn test_parse_path_gateway_param() {
        let segments = Node::parse_path("/v1/users/{email=*}");
        assert_eq!(
            segments[2],
            (
                "{email=*}".to_string(),
                SegmentKind::Param("email".to_string())
            )
        );
    }

    #[test]
    fn test_template_is_reported() {
        let mut root = Node::root();
        root.insert("/v1/users/{email=*}", MethodRouter::new().put("UpdatePassword"));

        let (methods, template, params) = root.match_path("/v1/users/bob").unwrap();
        assert_eq!(methods.get_operation(&Method::PUT), Some("UpdatePassword"));
        assert_eq!(template, "/v1/users/{email=*}");
        assert_eq!(params.get("email"), Some("bob"));
    }

    #[test]
    fn test_method_aware_backtracking() {
        let mut root = Node::root();
        root.insert("/v1/users/verify", MethodRouter::new().post("VerifyPassword"));
        root.insert("/v1/users/{email}", MethodRouter::new().put("UpdatePassword"));

        let (methods, template, params) = root.match_route(&Method::PUT, "/v1/users/verify").unwrap();
        assert_eq!(methods.get_operation(&Method::PUT), Some("UpdatePassword"));
        assert_eq!(template, "/v1/users/{email}");
        assert_eq!(params.get("email"), Some("verify"));

        let (_, template, params) = root.match_route(&Method::POST, "/v1/users/verify").unwrap();
        assert_eq!(template, "/v1/users/verify");
        assert!(params.is_empty());
    }

    #[test]
    fn test_backtracking_drops_params() {
        let mut root = Node::root();
        root.insert("/orgs/{org}/users", MethodRouter::new().get("ListOrgUsers"));
        root.insert("/orgs/acme/teams", MethodRouter::new().get("ListTeams"));

        let (_, _, params) = root.match_route(&Method::GET, "/orgs/acme/users").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("org"), Some("acme"));
    }

    #[test]
    fn test_static_children_stay_sorted() {
        let mut root = Node::root();
        root.insert("/c", MethodRouter::new().get("c"));
        root.insert("/a", MethodRouter::new().get("a"));
        root.insert("/b", MethodRouter::new().get("b"));

        let segments: Vec<_> = root.static_children.iter().map(|n| n.segment.as_str()).collect();
        assert_eq!(segments, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_no_match() {
        let mut root = Node::root();
        root.insert("/users", MethodRouter::new().get("listUsers"));
        assert!(root.match_path("/posts").is_none());
        assert!(root.match_route(&Method::POST, "/users").is_none());
    }
}
