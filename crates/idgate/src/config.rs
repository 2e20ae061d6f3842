//! Configuration for the idgate gateway.
//!
//! Settings are layered: defaults, then a TOML or JSON file, then `IDGATE_*`
//! environment variables, then command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener settings.
    pub server: ServerSettings,
    /// Backend settings.
    pub upstream: UpstreamSettings,
    /// Authentication and authorization settings.
    pub auth: AuthSettings,
    /// Password hashing settings.
    pub password: PasswordSettings,
    /// Logging and metrics settings.
    pub telemetry: TelemetrySettings,
}

impl GatewayConfig {
    /// Create a new configuration builder.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Load configuration from a `.toml` or `.json` file.
    pub fn from_file(path: impl Into<PathBuf>) -> ServerResult<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ServerError::config(format!("failed to read config file: {e}")))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match extension {
            "toml" => toml::from_str(&content)
                .map_err(|e| ServerError::config(format!("invalid TOML: {e}"))),
            "json" => serde_json::from_str(&content)
                .map_err(|e| ServerError::config(format!("invalid JSON: {e}"))),
            _ => Err(ServerError::config(format!(
                "unsupported config format: {extension}"
            ))),
        }
    }

    /// Apply `IDGATE_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`, keyed by environment variable name.
    ///
    /// Values that fail to parse are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(addr) = lookup("IDGATE_LISTEN_ADDR") {
            self.server.listen_addr = addr;
        }
        if let Some(port) = lookup("IDGATE_LISTEN_PORT").and_then(|p| p.parse().ok()) {
            self.server.listen_port = port;
        }
        if let Some(prefix) = lookup("IDGATE_ROUTE_PREFIX") {
            self.server.route_prefix = prefix;
        }

        if let Some(url) = lookup("IDGATE_UPSTREAM_URL") {
            self.upstream.url = url;
        }
        if let Some(timeout) = lookup("IDGATE_UPSTREAM_TIMEOUT")
            .and_then(|t| humantime_serde::parse_duration(&t).ok())
        {
            self.upstream.timeout = timeout;
        }
        if let Some(dir) = lookup("IDGATE_TLS_DIR") {
            self.upstream.tls = Some(TlsSource::Dir(PathBuf::from(dir)));
        }
        if let Some(secret) = lookup("IDGATE_TLS_SECRET") {
            self.upstream.tls = Some(TlsSource::Secret(secret));
        }

        if let Some(enabled) = lookup("IDGATE_AUTH_ENABLED").and_then(|v| v.parse().ok()) {
            self.auth.enabled = enabled;
        }
        if let Some(url) = lookup("IDGATE_ISSUER_URL") {
            self.auth.issuer_url = url;
        }
        if let Some(url) = lookup("IDGATE_JWKS_URL") {
            self.auth.jwks_url = url;
        }
        if let Some(audience) = lookup("IDGATE_AUDIENCE") {
            self.auth.audience = audience;
        }
        if let Some(roles) = lookup("IDGATE_ALLOWED_ROLES") {
            self.auth.allowed_roles = roles
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(cost) = lookup("IDGATE_BCRYPT_COST").and_then(|c| c.parse().ok()) {
            self.password.bcrypt_cost = cost;
        }

        if let Some(level) = lookup("IDGATE_LOG_LEVEL") {
            self.telemetry.log_level = level;
        }
        if let Some(json) = lookup("IDGATE_JSON_LOGS").and_then(|v| v.parse().ok()) {
            self.telemetry.json_logs = json;
        }

        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ServerResult<()> {
        if self.upstream.url.trim().is_empty() {
            return Err(ServerError::config("upstream url is required"));
        }
        if let Some((scheme, _)) = self.upstream.url.split_once("://") {
            if scheme != "http" && scheme != "https" {
                return Err(ServerError::config(
                    "upstream url must use http:// or https://",
                ));
            }
        }
        if self.upstream.tls.is_some() && self.upstream.url.starts_with("http://") {
            return Err(ServerError::config(
                "upstream TLS is configured but the upstream url is http://",
            ));
        }
        if let Some(TlsSource::Secret(reference)) = &self.upstream.tls {
            split_namespace_name(reference)?;
        }

        if self.server.max_request_body_size == 0 {
            return Err(ServerError::config("max_request_body_size must be positive"));
        }
        if !self.server.route_prefix.is_empty() && !self.server.route_prefix.starts_with('/') {
            return Err(ServerError::config("route_prefix must start with '/'"));
        }

        if !(4..=31).contains(&self.password.bcrypt_cost) {
            return Err(ServerError::config("bcrypt_cost must be between 4 and 31"));
        }

        if self.auth.enabled {
            if self.auth.jwks_url.is_empty() {
                return Err(ServerError::config("jwks_url is required when auth is enabled"));
            }
            if self.auth.audience.is_empty() {
                return Err(ServerError::config("audience is required when auth is enabled"));
            }
            if self.auth.allowed_roles.is_empty() {
                return Err(ServerError::config(
                    "allowed_roles must not be empty when auth is enabled",
                ));
            }
        }

        Ok(())
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind to.
    pub listen_addr: String,
    /// Port to listen on.
    pub listen_port: u16,
    /// Prefix the backend routes are mounted under, e.g. `/api`.
    pub route_prefix: String,
    /// Maximum request body size in bytes.
    pub max_request_body_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            route_prefix: String::new(),
            max_request_body_size: 1024 * 1024,
        }
    }
}

/// Backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Backend address. A bare `host:port` gets `http://`, or `https://`
    /// when TLS is configured.
    pub url: String,
    /// Timeout for one backend call.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Where the client TLS credentials come from; plaintext when absent.
    pub tls: Option<TlsSource>,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: "http://dex:5557".to_string(),
            timeout: Duration::from_secs(30),
            tls: None,
        }
    }
}

impl UpstreamSettings {
    /// Returns the backend base URL with a scheme and no trailing slash.
    pub fn base_url(&self) -> String {
        let url = self.url.trim().trim_end_matches('/');
        if url.contains("://") {
            url.to_string()
        } else if self.tls.is_some() {
            format!("https://{url}")
        } else {
            format!("http://{url}")
        }
    }
}

/// Source of the upstream client certificate, key and CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsSource {
    /// Directory holding `ca.crt`, `tls.crt` and `tls.key`.
    Dir(PathBuf),
    /// Kubernetes secret `namespace/name` with the same keys.
    Secret(String),
}

/// Splits a `namespace/name` reference.
pub fn split_namespace_name(reference: &str) -> ServerResult<(&str, &str)> {
    match reference.split_once('/') {
        Some((namespace, name))
            if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((namespace, name))
        }
        _ => Err(ServerError::config(format!(
            "secret reference must be namespace/name, got {reference:?}"
        ))),
    }
}

/// Authentication and authorization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Run the authentication and authorization stages.
    pub enabled: bool,
    /// Expected token issuer.
    pub issuer_url: String,
    /// Provider key set URL.
    pub jwks_url: String,
    /// Expected token audience.
    pub audience: String,
    /// Accept tokens from any issuer.
    pub skip_issuer_check: bool,
    /// Cluster roles that grant access.
    pub allowed_roles: Vec<String>,
    /// Deadline for one token verification.
    #[serde(with = "humantime_serde")]
    pub verify_timeout: Duration,
    /// Deadline for one role-binding lookup.
    #[serde(with = "humantime_serde")]
    pub lookup_timeout: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            issuer_url: "http://authentication-dex:5556/dex".to_string(),
            jwks_url: "http://authentication-dex:5556/dex/keys".to_string(),
            audience: "mke-dashboard".to_string(),
            skip_issuer_check: true,
            allowed_roles: vec!["cluster-admin".to_string()],
            verify_timeout: Duration::from_secs(5),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// Password hashing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    /// bcrypt cost factor.
    pub bcrypt_cost: u32,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        Self { bcrypt_cost: 10 }
    }
}

/// Logging and metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySettings {
    /// Log filter directive.
    pub log_level: String,
    /// Emit JSON logs.
    pub json_logs: bool,
    /// Serve Prometheus metrics on `/_idgate/metrics`.
    pub metrics_enabled: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: true,
            metrics_enabled: true,
        }
    }
}

/// Builder for `GatewayConfig`.
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    config: GatewayConfig,
}

impl GatewayConfigBuilder {
    /// Set the listen address.
    #[must_use]
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server.listen_addr = addr.into();
        self
    }

    /// Set the listen port.
    #[must_use]
    pub fn listen_port(mut self, port: u16) -> Self {
        self.config.server.listen_port = port;
        self
    }

    /// Set the route prefix.
    #[must_use]
    pub fn route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.server.route_prefix = prefix.into();
        self
    }

    /// Set the maximum request body size.
    #[must_use]
    pub fn max_request_body_size(mut self, size: usize) -> Self {
        self.config.server.max_request_body_size = size;
        self
    }

    /// Set the upstream URL.
    #[must_use]
    pub fn upstream_url(mut self, url: impl Into<String>) -> Self {
        self.config.upstream.url = url.into();
        self
    }

    /// Set the upstream timeout.
    #[must_use]
    pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
        self.config.upstream.timeout = timeout;
        self
    }

    /// Set the upstream TLS source.
    #[must_use]
    pub fn upstream_tls(mut self, source: TlsSource) -> Self {
        self.config.upstream.tls = Some(source);
        self
    }

    /// Enable or disable authentication and authorization.
    #[must_use]
    pub fn auth_enabled(mut self, enabled: bool) -> Self {
        self.config.auth.enabled = enabled;
        self
    }

    /// Set the allowed roles.
    #[must_use]
    pub fn allowed_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.auth.allowed_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the bcrypt cost.
    #[must_use]
    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.config.password.bcrypt_cost = cost;
        self
    }

    /// Enable or disable the metrics endpoint.
    #[must_use]
    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.config.telemetry.metrics_enabled = enabled;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ServerResult<GatewayConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Serde adapter for durations written as `500ms`, `30s`, `5m` or `1h`.
mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis();
        if millis % 1000 == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{millis}ms"))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        let (number, unit_secs, millis) = if let Some(n) = s.strip_suffix("ms") {
            (n, 0, true)
        } else if let Some(n) = s.strip_suffix('s') {
            (n, 1, false)
        } else if let Some(n) = s.strip_suffix('m') {
            (n, 60, false)
        } else if let Some(n) = s.strip_suffix('h') {
            (n, 3600, false)
        } else {
            (s, 1, false)
        };

        let n: u64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid duration {s:?}"))?;
        if millis {
            Ok(Duration::from_millis(n))
        } else {
            n.checked_mul(unit_secs)
                .map(Duration::from_secs)
                .ok_or_else(|| format!("duration {s:?} is out of range"))
        }
    }
}
