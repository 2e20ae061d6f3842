//! Routes the gateway forwards to the backend.

use idgate_router::{MethodRouter, Router};

/// Collection of password accounts.
pub const USERS_PATH: &str = "/v1/users";
/// A single password account, addressed by email.
pub const USER_PATH: &str = "/v1/users/{email=*}";
/// Password check.
pub const VERIFY_PATH: &str = "/v1/users/verify";

/// Builds the route table, mounted under `prefix`.
///
/// Operation ids name the backend RPC each route maps to.
#[must_use]
pub fn gateway_routes(prefix: &str) -> Router {
    let mut router = Router::with_prefix(prefix);
    router.insert(
        USERS_PATH,
        MethodRouter::new()
            .get("ListPasswords")
            .post("CreatePassword"),
    );
    router.insert(VERIFY_PATH, MethodRouter::new().post("VerifyPassword"));
    router.insert(
        USER_PATH,
        MethodRouter::new()
            .put("UpdatePassword")
            .delete("DeletePassword"),
    );
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use idgate_router::Resolution;

    #[test]
    fn test_user_routes() {
        let router = gateway_routes("");

        let m = router.match_route(&Method::POST, "/v1/users").unwrap();
        assert_eq!(m.operation_id, "CreatePassword");

        let m = router.match_route(&Method::GET, "/v1/users").unwrap();
        assert_eq!(m.operation_id, "ListPasswords");

        let m = router
            .match_route(&Method::PUT, "/v1/users/alice@example.com")
            .unwrap();
        assert_eq!(m.operation_id, "UpdatePassword");
        assert_eq!(m.template, "/v1/users/{email=*}");
        assert_eq!(m.params.get("email"), Some("alice@example.com"));

        let m = router
            .match_route(&Method::DELETE, "/v1/users/alice@example.com")
            .unwrap();
        assert_eq!(m.operation_id, "DeletePassword");
    }

    #[test]
    fn test_verify_is_not_an_email() {
        let router = gateway_routes("");
        let m = router.match_route(&Method::POST, "/v1/users/verify").unwrap();
        assert_eq!(m.operation_id, "VerifyPassword");
    }

    #[test]
    fn test_prefixed_routes() {
        let router = gateway_routes("/api");
        let m = router.match_route(&Method::POST, "/api/v1/users").unwrap();
        assert_eq!(m.template, "/api/v1/users");
        assert!(router.match_route(&Method::POST, "/v1/users").is_none());
    }

    #[test]
    fn test_unrouted_requests() {
        let router = gateway_routes("");
        assert_eq!(router.resolve(&Method::GET, "/v2/users"), Resolution::NotFound);
        match router.resolve(&Method::PATCH, "/v1/users") {
            Resolution::MethodNotAllowed(allowed) => {
                assert!(allowed.contains(&Method::GET));
                assert!(allowed.contains(&Method::POST));
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }
}
