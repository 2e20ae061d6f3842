//! OIDC ID token verification against a provider's published key set.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{AuthError, AuthResult};
use crate::verifier::{Claims, TokenVerifier};

/// Provider settings for [`OidcVerifier`].
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Expected `iss` claim.
    pub issuer_url: String,
    /// URL of the provider's JSON Web Key Set.
    pub jwks_url: String,
    /// Expected `aud` claim.
    pub audience: String,
    /// Accept tokens whose issuer differs from `issuer_url`.
    ///
    /// Needed when the issuer URL the provider advertises is not reachable
    /// from where the gateway runs.
    pub skip_issuer_check: bool,
    /// Timeout for key set requests.
    pub http_timeout: Duration,
    /// Minimum time between refetches triggered by an unknown key id.
    pub min_refresh_interval: Duration,
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer_url: "http://authentication-dex:5556/dex".to_string(),
            jwks_url: "http://authentication-dex:5556/dex/keys".to_string(),
            audience: "mke-dashboard".to_string(),
            skip_issuer_check: true,
            http_timeout: Duration::from_secs(10),
            min_refresh_interval: Duration::from_secs(10),
        }
    }
}

/// Verifies ID tokens with keys fetched from the provider.
///
/// Keys are fetched on first use and cached. A token signed with a key id
/// missing from the cache triggers a refetch, which picks up rotated keys.
/// Concurrent fetches are coalesced into one, and unknown-kid refetches
/// happen at most once per `min_refresh_interval`.
#[derive(Debug)]
pub struct OidcVerifier {
    config: OidcConfig,
    client: reqwest::Client,
    keys: RwLock<Option<Arc<JwkSet>>>,
    last_refresh: RwLock<Option<Instant>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl OidcVerifier {
    /// Creates a verifier with its own HTTP client.
    pub fn new(config: OidcConfig) -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::KeySet(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    /// Creates a verifier that fetches keys with `client`.
    pub fn with_client(config: OidcConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            keys: RwLock::new(None),
            last_refresh: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the provider settings.
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// Fetches the key set and replaces the cache.
    pub async fn refresh_keys(&self) -> AuthResult<Arc<JwkSet>> {
        let set: JwkSet = self
            .client
            .get(&self.config.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AuthError::KeySet(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::KeySet(e.to_string()))?;

        debug!(url = %self.config.jwks_url, keys = set.keys.len(), "Fetched signing keys");

        let set = Arc::new(set);
        *self.keys.write() = Some(Arc::clone(&set));
        *self.last_refresh.write() = Some(Instant::now());
        Ok(set)
    }

    fn cached_keys_for(&self, kid: Option<&str>) -> Option<Arc<JwkSet>> {
        self.keys
            .read()
            .clone()
            .filter(|set| kid.map_or(true, |kid| set.find(kid).is_some()))
    }

    async fn keys_for(&self, kid: Option<&str>) -> AuthResult<Arc<JwkSet>> {
        if let Some(set) = self.cached_keys_for(kid) {
            return Ok(set);
        }

        let _guard = self.refresh_lock.lock().await;

        // another task may have refreshed while this one waited
        if let Some(set) = self.cached_keys_for(kid) {
            return Ok(set);
        }

        let cached = self.keys.read().clone();
        if let Some(set) = cached {
            let recent = self
                .last_refresh
                .read()
                .is_some_and(|at| at.elapsed() < self.config.min_refresh_interval);
            if recent {
                debug!(kid = ?kid, "Unknown key id, refresh is on cooldown");
                return Ok(set);
            }
        }

        self.refresh_keys().await
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.set_audience(&[self.config.audience.as_str()]);
        if !self.config.skip_issuer_check {
            validation.set_issuer(&[self.config.issuer_url.as_str()]);
        }
        validation
    }
}

#[async_trait]
impl TokenVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> AuthResult<Claims> {
        let header = decode_header(token).map_err(|e| AuthError::invalid(e.to_string()))?;

        // ID tokens are signed with the provider's asymmetric keys
        if matches!(
            header.alg,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(AuthError::invalid(format!(
                "unsupported signing algorithm {:?}",
                header.alg
            )));
        }

        let kid = header.kid.as_deref();
        let keys = self.keys_for(kid).await?;
        let validation = self.validation(header.alg);

        let mut last_error = AuthError::invalid("no signing key matches the token");
        let candidates = keys
            .keys
            .iter()
            .filter(|jwk| kid.map_or(true, |kid| jwk.common.key_id.as_deref() == Some(kid)));

        for jwk in candidates {
            let key = match DecodingKey::from_jwk(jwk) {
                Ok(key) => key,
                Err(e) => {
                    last_error = AuthError::invalid(e.to_string());
                    continue;
                }
            };
            match decode::<Claims>(token, &key, &validation) {
                Ok(data) => return Ok(data.claims),
                Err(e) => last_error = AuthError::invalid(e.to_string()),
            }
        }

        Err(last_error)
    }
}
