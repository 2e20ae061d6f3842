//! Per-path operation table keyed by HTTP method.

use http::Method;
use smallvec::SmallVec;

/// Maps HTTP methods to operation IDs for a single path.
///
/// Methods keep their registration order, which is also the order
/// reported by [`MethodRouter::allowed_methods`].
///
/// # Example
///
/// ```rust
/// use idgate_router::MethodRouter;
/// use http::Method;
///
/// let router = MethodRouter::new().put("UpdatePassword").delete("DeletePassword");
///
/// assert_eq!(router.get_operation(&Method::PUT), Some("UpdatePassword"));
/// assert_eq!(router.get_operation(&Method::GET), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodRouter {
    entries: SmallVec<[(Method, String); 4]>,
}

impl MethodRouter {
    /// Creates an empty method router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `operation_id` for GET.
    #[must_use]
    pub fn get(self, operation_id: impl Into<String>) -> Self {
        self.method(&Method::GET, operation_id)
    }

    /// Registers `operation_id` for POST.
    #[must_use]
    pub fn post(self, operation_id: impl Into<String>) -> Self {
        self.method(&Method::POST, operation_id)
    }

    /// Registers `operation_id` for PUT.
    #[must_use]
    pub fn put(self, operation_id: impl Into<String>) -> Self {
        self.method(&Method::PUT, operation_id)
    }

    /// Registers `operation_id` for PATCH.
    #[must_use]
    pub fn patch(self, operation_id: impl Into<String>) -> Self {
        self.method(&Method::PATCH, operation_id)
    }

    /// Registers `operation_id` for DELETE.
    #[must_use]
    pub fn delete(self, operation_id: impl Into<String>) -> Self {
        self.method(&Method::DELETE, operation_id)
    }

    /// Registers `operation_id` for an arbitrary method, replacing any
    /// earlier registration for it.
    #[must_use]
    pub fn method(mut self, method: &Method, operation_id: impl Into<String>) -> Self {
        self.set(method.clone(), operation_id.into());
        self
    }

    fn set(&mut self, method: Method, operation_id: String) {
        match self.entries.iter_mut().find(|(m, _)| *m == method) {
            Some(entry) => entry.1 = operation_id,
            None => self.entries.push((method, operation_id)),
        }
    }

    /// Returns the operation ID registered for `method`.
    #[must_use]
    pub fn get_operation(&self, method: &Method) -> Option<&str> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, op)| op.as_str())
    }

    /// Merges another router into this one; `other` wins on conflicts.
    pub fn merge(&mut self, other: MethodRouter) {
        for (method, operation_id) in other.entries {
            self.set(method, operation_id);
        }
    }

    /// Returns the registered methods in registration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.entries.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Returns true if at least one method is registered.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        !self.entries.is_empty()
    }
}
