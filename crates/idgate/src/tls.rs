//! Client TLS credentials for the backend connection.
//!
//! Credentials come either from a directory or from a Kubernetes secret,
//! both holding `ca.crt`, `tls.crt` and `tls.key`.

use std::collections::HashMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use idgate_authz::KubeClient;
use serde::Deserialize;
use tracing::info;

use crate::config::split_namespace_name;
use crate::error::{ServerError, ServerResult};

/// CA certificate key.
pub const CA_CERT: &str = "ca.crt";
/// Client certificate key.
pub const CLIENT_CERT: &str = "tls.crt";
/// Client private key key.
pub const CLIENT_KEY: &str = "tls.key";

/// PEM-encoded CA, client certificate and client key.
#[derive(Clone)]
pub struct TlsMaterial {
    ca_pem: Vec<u8>,
    cert_pem: Vec<u8>,
    key_pem: Vec<u8>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("ca_pem", &self.ca_pem.len())
            .field("cert_pem", &self.cert_pem.len())
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct Secret {
    #[serde(default)]
    data: HashMap<String, String>,
}

impl TlsMaterial {
    /// Creates material from PEM bytes.
    pub fn new(ca_pem: Vec<u8>, cert_pem: Vec<u8>, key_pem: Vec<u8>) -> Self {
        Self {
            ca_pem,
            cert_pem,
            key_pem,
        }
    }

    /// Reads `ca.crt`, `tls.crt` and `tls.key` from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> ServerResult<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            std::fs::read(dir.join(name)).map_err(|e| {
                ServerError::tls(format!("failed to read {}: {e}", dir.join(name).display()))
            })
        };

        let material = Self::new(read(CA_CERT)?, read(CLIENT_CERT)?, read(CLIENT_KEY)?);
        info!(dir = %dir.display(), "Loaded upstream TLS credentials");
        Ok(material)
    }

    /// Decodes the base64 `data` map of a Kubernetes secret.
    pub fn from_secret_data(data: &HashMap<String, String>) -> ServerResult<Self> {
        let decode = |name: &str| {
            let encoded = data
                .get(name)
                .ok_or_else(|| ServerError::tls(format!("secret has no {name} entry")))?;
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| ServerError::tls(format!("{name} is not valid base64: {e}")))
        };

        Ok(Self::new(
            decode(CA_CERT)?,
            decode(CLIENT_CERT)?,
            decode(CLIENT_KEY)?,
        ))
    }

    /// Fetches the secret named by `reference` (`namespace/name`).
    pub async fn from_secret(client: &KubeClient, reference: &str) -> ServerResult<Self> {
        let (namespace, name) = split_namespace_name(reference)?;
        let secret: Secret = client
            .get_json(&format!("/api/v1/namespaces/{namespace}/secrets/{name}"))
            .await
            .map_err(|e| ServerError::tls(format!("failed to fetch secret {reference}: {e}")))?;

        let material = Self::from_secret_data(&secret.data)?;
        info!(secret = %reference, "Loaded upstream TLS credentials");
        Ok(material)
    }

    /// Installs the CA as the only trust root and presents the client identity.
    pub fn apply(&self, builder: reqwest::ClientBuilder) -> ServerResult<reqwest::ClientBuilder> {
        let ca = reqwest::Certificate::from_pem(&self.ca_pem)
            .map_err(|e| ServerError::tls(format!("invalid CA certificate: {e}")))?;

        let mut identity_pem = self.cert_pem.clone();
        if !identity_pem.ends_with(b"\n") {
            identity_pem.push(b'\n');
        }
        identity_pem.extend_from_slice(&self.key_pem);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| ServerError::tls(format!("invalid client certificate or key: {e}")))?;

        Ok(builder
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .add_root_certificate(ca)
            .identity(identity))
    }

    /// CA certificate PEM.
    pub fn ca_pem(&self) -> &[u8] {
        &self.ca_pem
    }

    /// Client certificate PEM.
    pub fn cert_pem(&self) -> &[u8] {
        &self.cert_pem
    }
}
