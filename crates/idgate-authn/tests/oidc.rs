//! OIDC verification against a stand-in key set endpoint.

use std::sync::Arc;
use std::time::Duration;

use idgate_authn::{AuthError, Authenticator, OidcConfig, OidcVerifier, TokenVerifier};
use jsonwebtoken::{encode, get_current_timestamp, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY: &[u8] = include_bytes!("fixtures/rsa_private.pem");
const KEY_ID: &str = "test-key";
const MODULUS: &str = "5D1QQ1uwZ_napMeP7Gac7ufBZ_AYdWO3XOk1T_GQjI9MYJMh0hip3K9tHJ0NwEDTNd6vhYsoiUu_p59oIdF1ydSnauIWlCYOGWT8Wr1i3e_blGWRjYsm5XqwCSwr1C6HUXNX7hucULBhXSzhAVTyEC3aM8ORTuli4wyDUWiCNkxiokjvYpwxxhZaVOX2AardRPtycSGw42U1_1y8fJ6-DbTnIP6s1pvlfI9WaIWdxngB53UJpUeNjC9aqOAakvjUyl6LoN20IvN4O-7wy47j9ghfXArQGAzKjutA9yzun0uTKOAcjEpSwffWn7tv_aHnI-05yJJ7AzAkvhXYphF79w";

fn jwks() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": KEY_ID,
            "n": MODULUS,
            "e": "AQAB"
        }]
    })
}

fn claims(audience: &str, issuer: &str, verified: bool) -> Value {
    json!({
        "iss": issuer,
        "aud": audience,
        "sub": "CiQwOGE4Njg0Yi1kYjg4",
        "exp": get_current_timestamp() + 3600,
        "email": "alice@example.com",
        "email_verified": verified,
        "groups": ["admins"]
    })
}

fn sign(claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY).unwrap();
    encode(&header, claims, &key).unwrap()
}

fn default_token() -> String {
    sign(
        &claims("mke-dashboard", "http://authentication-dex:5556/dex", true),
        Some(KEY_ID),
    )
}

async fn verifier_for(server: &MockServer, skip_issuer_check: bool) -> OidcVerifier {
    OidcVerifier::new(OidcConfig {
        jwks_url: format!("{}/dex/keys", server.uri()),
        skip_issuer_check,
        ..OidcConfig::default()
    })
    .unwrap()
}

fn verifier_with_cooldown(server: &MockServer, min_refresh_interval: Duration) -> OidcVerifier {
    OidcVerifier::new(OidcConfig {
        jwks_url: format!("{}/dex/keys", server.uri()),
        skip_issuer_check: true,
        min_refresh_interval,
        ..OidcConfig::default()
    })
    .unwrap()
}

async fn serve_keys(server: &MockServer, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/dex/keys"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks()))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_valid_token_yields_claims() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_for(&server, true).await;

    let claims = verifier.verify(&default_token()).await.unwrap();
    assert_eq!(claims.email, "alice@example.com");
    assert!(claims.email_verified);
    assert_eq!(claims.groups, vec!["admins".to_string()]);
}

#[tokio::test]
async fn test_keys_are_cached() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_for(&server, true).await;

    let token = default_token();
    verifier.verify(&token).await.unwrap();
    verifier.verify(&token).await.unwrap();
}

#[tokio::test]
async fn test_token_without_kid_tries_every_key() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_for(&server, true).await;

    let token = sign(
        &claims("mke-dashboard", "http://authentication-dex:5556/dex", true),
        None,
    );
    assert!(verifier.verify(&token).await.is_ok());
}

#[tokio::test]
async fn test_unknown_kid_refetches_keys() {
    let server = MockServer::start().await;
    serve_keys(&server, 2).await;
    let verifier = verifier_with_cooldown(&server, Duration::ZERO);

    let token = sign(
        &claims("mke-dashboard", "http://authentication-dex:5556/dex", true),
        Some("rotated"),
    );
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::InvalidCredential(_))
    ));
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::InvalidCredential(_))
    ));
}

#[tokio::test]
async fn test_unknown_kid_refetch_respects_cooldown() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_with_cooldown(&server, Duration::from_secs(60));

    assert!(verifier.verify(&default_token()).await.is_ok());

    for i in 0..5 {
        let kid = format!("rotated-{i}");
        let token = sign(
            &claims("mke-dashboard", "http://authentication-dex:5556/dex", true),
            Some(&kid),
        );
        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::InvalidCredential(_))
        ));
    }

    // known keys keep working while the refetch is on cooldown
    assert!(verifier.verify(&default_token()).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_first_fetch_is_shared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dex/keys"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jwks())
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let verifier = Arc::new(verifier_for(&server, true).await);

    let token = default_token();
    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let verifier = Arc::clone(&verifier);
            let token = token.clone();
            tokio::spawn(async move { verifier.verify(&token).await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn test_wrong_audience_rejected() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_for(&server, true).await;

    let token = sign(
        &claims("other-client", "http://authentication-dex:5556/dex", true),
        Some(KEY_ID),
    );
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::InvalidCredential(_))
    ));
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_for(&server, true).await;

    let mut expired = claims("mke-dashboard", "http://authentication-dex:5556/dex", true);
    expired["exp"] = json!(get_current_timestamp() - 3600);
    let token = sign(&expired, Some(KEY_ID));

    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::InvalidCredential(_))
    ));
}

#[tokio::test]
async fn test_issuer_check_can_be_skipped() {
    let server = MockServer::start().await;
    serve_keys(&server, 2).await;

    let token = sign(
        &claims("mke-dashboard", "https://dex.example.com", true),
        Some(KEY_ID),
    );

    let lenient = verifier_for(&server, true).await;
    assert!(lenient.verify(&token).await.is_ok());

    let strict = verifier_for(&server, false).await;
    assert!(matches!(
        strict.verify(&token).await,
        Err(AuthError::InvalidCredential(_))
    ));
}

#[tokio::test]
async fn test_symmetric_token_rejected_without_fetch() {
    let server = MockServer::start().await;
    serve_keys(&server, 0).await;
    let verifier = verifier_for(&server, true).await;

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims("mke-dashboard", "http://authentication-dex:5556/dex", true),
        &EncodingKey::from_secret(b"shared-secret"),
    )
    .unwrap();

    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::InvalidCredential(_))
    ));
}

#[tokio::test]
async fn test_key_set_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dex/keys"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let verifier = verifier_for(&server, true).await;

    assert!(matches!(
        verifier.verify(&default_token()).await,
        Err(AuthError::KeySet(_))
    ));
}

#[tokio::test]
async fn test_authenticator_rejects_unverified_email() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_for(&server, true).await;
    let authenticator = Authenticator::new(Arc::new(verifier), Duration::from_secs(5));

    let token = sign(
        &claims("mke-dashboard", "http://authentication-dex:5556/dex", false),
        Some(KEY_ID),
    );
    assert!(matches!(
        authenticator.authenticate(&token).await,
        Err(AuthError::UnverifiedIdentity { .. })
    ));
}

#[tokio::test]
async fn test_authenticator_builds_identity() {
    let server = MockServer::start().await;
    serve_keys(&server, 1).await;
    let verifier = verifier_for(&server, true).await;
    let authenticator = Authenticator::new(Arc::new(verifier), Duration::from_secs(5));

    let identity = authenticator.authenticate(&default_token()).await.unwrap();
    assert_eq!(identity.email(), "alice@example.com");
    assert!(identity.in_group("admins"));
}
