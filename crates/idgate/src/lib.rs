//! # idgate
//!
//! An authenticating REST gateway in front of the Dex password API.
//!
//! ```text
//!  client ──HTTP/JSON──► idgate ──HTTP/JSON (optionally mTLS)──► Dex API gateway
//!                          │
//!                          ├─ route table (404 / 405 before anything else)
//!                          ├─ logging
//!                          ├─ authentication  (OIDC ID token)
//!                          ├─ authorization   (cluster role bindings)
//!                          └─ body transform  (validate, bcrypt, user id)
//! ```
//!
//! Authentication and authorization run only when `auth.enabled` is set.
//! The gateway's own endpoints live under `/_idgate/` and bypass the
//! pipeline.
//!
//! # Example Usage
//!
//! ```bash
//! # Plaintext backend, auth on, default Dex endpoints
//! $ idgate --grpc-server dex:5557 --http-port 8080
//!
//! # Client certificates from a Kubernetes secret
//! $ idgate --dex-grpc-cert-secret mke/dex-grpc.tls
//!
//! # Local development without a cluster
//! $ IDGATE_LOG_LEVEL=debug idgate --disable-auth --upstream http://localhost:5557
//! ```

#![doc(html_root_url = "https://docs.rs/idgate/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod routes;
pub mod server;
pub mod tls;

pub use config::{GatewayConfig, GatewayConfigBuilder, TlsSource};
pub use dispatch::UpstreamDispatcher;
pub use error::{ServerError, ServerResult};
pub use health::{HealthChecker, HealthStatus, ReadinessStatus};
pub use routes::gateway_routes;
pub use server::GatewayServer;
pub use tls::TlsMaterial;

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
