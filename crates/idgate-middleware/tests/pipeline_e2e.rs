//! End-to-end tests for the gateway pipeline.
//!
//! The verifier and role lookup are in-memory fakes; the dispatcher is a
//! closure that records what would have been forwarded.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use idgate_authn::{AuthError, AuthResult, Authenticator, Claims, TokenVerifier};
use idgate_authz::{
    AuthzResult, Authorizer, RoleAllowList, RoleBinding, RoleBindingLookup, StaticRoleBindings,
};
use idgate_middleware::{
    AuthStages, BoxFuture, GatewayContext, PasswordHasher, Pipeline, Request, Response,
    RouteInfo, MIN_COST, REQUEST_ID_HEADER,
};
use idgate_router::Params;
use parking_lot::Mutex;
use serde_json::{json, Value};

// =============================================================================
// Fakes
// =============================================================================

/// Accepts `admin-token`, `viewer-token` and `unverified-token`.
struct FakeVerifier {
    calls: AtomicUsize,
}

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (email, verified) = match token {
            "admin-token" => ("admin@example.com", true),
            "viewer-token" => ("viewer@example.com", true),
            "unverified-token" => ("admin@example.com", false),
            _ => return Err(AuthError::invalid("signature mismatch")),
        };
        Ok(Claims {
            email: email.to_string(),
            email_verified: verified,
            groups: Vec::new(),
        })
    }
}

struct CountingLookup {
    inner: StaticRoleBindings,
    calls: AtomicUsize,
}

#[async_trait]
impl RoleBindingLookup for CountingLookup {
    async fn list_role_bindings(&self) -> AuthzResult<Vec<RoleBinding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_role_bindings().await
    }
}

/// What reached the dispatcher.
#[derive(Default)]
struct Forwarded {
    requests: Mutex<Vec<(Method, Value)>>,
}

impl Forwarded {
    fn count(&self) -> usize {
        self.requests.lock().len()
    }

    fn last_body(&self) -> Value {
        self.requests
            .lock()
            .last()
            .map(|(_, body)| body.clone())
            .unwrap_or(Value::Null)
    }
}

struct Harness {
    pipeline: Pipeline,
    verifier: Arc<FakeVerifier>,
    lookup: Arc<CountingLookup>,
    forwarded: Arc<Forwarded>,
}

impl Harness {
    fn new(auth_enabled: bool) -> Self {
        let verifier = Arc::new(FakeVerifier {
            calls: AtomicUsize::new(0),
        });
        let lookup = Arc::new(CountingLookup {
            inner: StaticRoleBindings::new(vec![
                RoleBinding::new("User", "admin@example.com", "cluster-admin"),
                RoleBinding::new("User", "viewer@example.com", "view"),
            ]),
            calls: AtomicUsize::new(0),
        });

        let auth = auth_enabled.then(|| AuthStages {
            authenticator: Authenticator::new(verifier.clone(), Duration::from_secs(1)),
            authorizer: Authorizer::new(
                lookup.clone(),
                RoleAllowList::default(),
                Duration::from_secs(1),
            ),
        });

        Self {
            pipeline: Pipeline::standard(auth, PasswordHasher::new(MIN_COST).unwrap()),
            verifier,
            lookup,
            forwarded: Arc::new(Forwarded::default()),
        }
    }

    async fn send(
        &self,
        method: Method,
        template: &str,
        email: Option<&str>,
        token: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value, Response) {
        let mut params = Params::new();
        if let Some(email) = email {
            params.push("email", email);
        }
        let ctx = GatewayContext::new().with_route(RouteInfo::new("op", template, params));

        let mut builder = http::Request::builder().method(method).uri("/api/v1/users");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request: Request = builder
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();

        let forwarded = self.forwarded.clone();
        let handler = move |_ctx: &mut GatewayContext, req: Request| -> BoxFuture<'static, Response> {
            Box::pin(async move {
                let method = req.method().clone();
                let bytes = req.into_body().collect().await.unwrap().to_bytes();
                let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
                forwarded.requests.lock().push((method, body));
                http::Response::new(Full::new(Bytes::from_static(b"{}")))
            })
        };

        let response = self.pipeline.process(ctx, request, handler).await;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        let mut echo = http::Response::new(Full::new(Bytes::new()));
        *echo.headers_mut() = headers;
        (status, json, echo)
    }

    async fn create(&self, token: Option<&str>, body: &Value) -> (StatusCode, Value) {
        let (status, json, _) = self
            .send(Method::POST, "/api/v1/users", None, token, body)
            .await;
        (status, json)
    }
}

fn create_body(password: &str) -> Value {
    json!({
        "email": "alice",
        "hash": STANDARD.encode(password),
        "username": "Alice",
    })
}

fn forwarded_hash(body: &Value, field: &str) -> String {
    String::from_utf8(STANDARD.decode(body[field].as_str().unwrap()).unwrap()).unwrap()
}

// =============================================================================
// Authentication and authorization
// =============================================================================

#[tokio::test]
async fn test_admin_create_is_forwarded() {
    let harness = Harness::new(true);
    let (status, _) = harness
        .create(Some("admin-token"), &create_body("password123"))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.forwarded.count(), 1);
    let body = harness.forwarded.last_body();
    assert!(bcrypt::verify("password123", &forwarded_hash(&body, "hash")).unwrap());
}

#[tokio::test]
async fn test_missing_credential_stops_before_body_stage() {
    let harness = Harness::new(true);
    // would fail validation if the body stage ran
    let (status, body) = harness.create(None, &json!({ "email": "x" })).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(harness.verifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.lookup.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.forwarded.count(), 0);
}

#[tokio::test]
async fn test_invalid_token_is_unauthorized() {
    let harness = Harness::new(true);
    let (status, _) = harness
        .create(Some("forged-token"), &create_body("password123"))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(harness.lookup.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.forwarded.count(), 0);
}

#[tokio::test]
async fn test_unverified_email_is_unauthorized() {
    let harness = Harness::new(true);
    let (status, _) = harness
        .create(Some("unverified-token"), &create_body("password123"))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(harness.forwarded.count(), 0);
}

#[tokio::test]
async fn test_roles_outside_allow_list_are_forbidden() {
    let harness = Harness::new(true);
    let (status, body) = harness
        .create(Some("viewer-token"), &create_body("password123"))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden");
    assert_eq!(harness.forwarded.count(), 0);
}

#[tokio::test]
async fn test_non_mutation_routes_are_still_authorized() {
    let harness = Harness::new(true);
    let (status, _, _) = harness
        .send(Method::GET, "/api/v1/users", None, Some("viewer-token"), &json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = harness
        .send(Method::GET, "/api/v1/users", None, Some("admin-token"), &json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_auth_disabled_skips_both_stages() {
    let harness = Harness::new(false);
    let (status, _) = harness.create(None, &create_body("password123")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.verifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.lookup.calls.load(Ordering::SeqCst), 0);

    // body rewriting still runs
    let body = harness.forwarded.last_body();
    assert!(bcrypt::verify("password123", &forwarded_hash(&body, "hash")).unwrap());
}

// =============================================================================
// Body transformation
// =============================================================================

#[tokio::test]
async fn test_password_length_bounds() {
    let harness = Harness::new(false);

    for (password, expected) in [
        ("short".to_string(), StatusCode::BAD_REQUEST),
        ("a".repeat(8), StatusCode::OK),
        ("a".repeat(64), StatusCode::OK),
        ("a".repeat(65), StatusCode::BAD_REQUEST),
    ] {
        let (status, _) = harness.create(None, &create_body(&password)).await;
        assert_eq!(status, expected, "password of {} chars", password.len());
    }
    assert_eq!(harness.forwarded.count(), 2);
}

#[tokio::test]
async fn test_identical_creates_get_distinct_ids() {
    let harness = Harness::new(false);
    let body = create_body("password123");

    harness.create(None, &body).await;
    let first = harness.forwarded.last_body();
    harness.create(None, &body).await;
    let second = harness.forwarded.last_body();

    assert_ne!(first["userId"], second["userId"]);
    assert_ne!(first["hash"], second["hash"]);
}

#[tokio::test]
async fn test_forwarded_hash_never_equals_plaintext() {
    let harness = Harness::new(false);
    harness.create(None, &create_body("password123")).await;

    let body = harness.forwarded.last_body();
    let hash = forwarded_hash(&body, "hash");
    assert_ne!(hash, "password123");
    assert!(bcrypt::verify("password123", &hash).unwrap());
}

#[tokio::test]
async fn test_validation_error_message() {
    let harness = Harness::new(false);
    let (status, body) = harness.create(None, &create_body("pass word1")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Bad Request");
    assert_eq!(body["message"], "password cannot contain white spaces");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_padded_password_is_rejected() {
    let harness = Harness::new(false);
    let (status, body) = harness.create(None, &create_body(" password123 ")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "password cannot contain white spaces");
    assert_eq!(harness.forwarded.count(), 0);
}

#[tokio::test]
async fn test_password_over_bcrypt_limit_is_rejected() {
    let harness = Harness::new(false);
    let (status, body) = harness.create(None, &create_body(&"é".repeat(37))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "invalid password, must be at most 72 bytes");
    assert_eq!(harness.forwarded.count(), 0);
}

#[tokio::test]
async fn test_empty_update_forwards_no_changes() {
    let harness = Harness::new(false);
    let (status, _, _) = harness
        .send(
            Method::PUT,
            "/api/v1/users/{email=*}",
            Some("alice"),
            None,
            &json!({}),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.forwarded.last_body(), json!({ "email": "alice" }));
}

#[tokio::test]
async fn test_update_hashes_new_password() {
    let harness = Harness::new(true);
    let (status, _, _) = harness
        .send(
            Method::PUT,
            "/api/v1/users/{email=*}",
            Some("alice"),
            Some("admin-token"),
            &json!({ "newHash": STANDARD.encode("newpassword1") }),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    let body = harness.forwarded.last_body();
    assert!(bcrypt::verify("newpassword1", &forwarded_hash(&body, "newHash")).unwrap());
    assert!(body.get("newUsername").is_none());
}

#[tokio::test]
async fn test_verify_route_passes_through() {
    let harness = Harness::new(false);
    let original = json!({ "email": "alice", "hash": STANDARD.encode("password123") });
    let (status, _, _) = harness
        .send(Method::POST, "/api/v1/users/verify", None, None, &original)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(harness.forwarded.last_body(), original);
}

// =============================================================================
// Logging
// =============================================================================

#[tokio::test]
async fn test_every_response_carries_request_id() {
    let harness = Harness::new(true);

    let (_, _, ok) = harness
        .send(Method::GET, "/api/v1/users", None, Some("admin-token"), &json!({}))
        .await;
    assert!(ok.headers().contains_key(REQUEST_ID_HEADER));

    let (_, body, rejected) = harness
        .send(Method::GET, "/api/v1/users", None, None, &json!({}))
        .await;
    let header = rejected.headers()[REQUEST_ID_HEADER].to_str().unwrap();
    assert_eq!(body["request_id"], header);
}

// =============================================================================
// Cancellation
// =============================================================================

struct SlowVerifier {
    delay: Duration,
}

#[async_trait]
impl TokenVerifier for SlowVerifier {
    async fn verify(&self, _token: &str) -> AuthResult<Claims> {
        tokio::time::sleep(self.delay).await;
        Ok(Claims {
            email: "admin@example.com".to_string(),
            email_verified: true,
            groups: Vec::new(),
        })
    }
}

fn slow_pipeline() -> Pipeline {
    let auth = AuthStages {
        authenticator: Authenticator::new(
            Arc::new(SlowVerifier {
                delay: Duration::from_millis(300),
            }),
            Duration::from_secs(5),
        ),
        authorizer: Authorizer::new(
            Arc::new(StaticRoleBindings::new(vec![RoleBinding::new(
                "User",
                "admin@example.com",
                "cluster-admin",
            )])),
            RoleAllowList::default(),
            Duration::from_secs(5),
        ),
    };
    Pipeline::standard(Some(auth), PasswordHasher::new(MIN_COST).unwrap())
}

async fn run_slow_create(pipeline: &Pipeline, dispatched: Arc<AtomicUsize>) -> Response {
    let ctx = GatewayContext::new().with_route(RouteInfo::new("op", "/api/v1/users", Params::new()));
    let request: Request = http::Request::builder()
        .method(Method::POST)
        .uri("/api/v1/users")
        .header("authorization", "Bearer admin-token")
        .body(Full::new(Bytes::from(create_body("password123").to_string())))
        .unwrap();
    let handler = move |_ctx: &mut GatewayContext, _req: Request| -> BoxFuture<'static, Response> {
        Box::pin(async move {
            dispatched.fetch_add(1, Ordering::SeqCst);
            http::Response::new(Full::new(Bytes::from_static(b"{}")))
        })
    };
    pipeline.process(ctx, request, handler).await
}

#[tokio::test]
async fn test_abandoned_request_is_never_dispatched() {
    let pipeline = slow_pipeline();
    let dispatched = Arc::new(AtomicUsize::new(0));

    // caller gives up while authentication is still in flight
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        run_slow_create(&pipeline, dispatched.clone()),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(dispatched.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_slow_request_completes_when_awaited() {
    let pipeline = slow_pipeline();
    let dispatched = Arc::new(AtomicUsize::new(0));

    let response = run_slow_create(&pipeline, dispatched.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(dispatched.load(Ordering::SeqCst), 1);
}
