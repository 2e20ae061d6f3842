//! Minimal Kubernetes API client using in-cluster credentials.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::binding::RoleBinding;
use crate::error::{AuthzError, AuthzResult};
use crate::lookup::RoleBindingLookup;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const CLUSTER_ROLE_BINDINGS_PATH: &str = "/apis/rbac.authorization.k8s.io/v1/clusterrolebindings";

/// Connection settings for the Kubernetes API.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    /// API server base URL, without a trailing slash.
    pub api_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// PEM bundle that signs the API server certificate.
    pub ca_pem: Option<Vec<u8>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl KubeConfig {
    /// Settings for an API server at `api_url` with no credentials.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            ca_pem: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Loads the service account credentials mounted into every pod.
    pub fn in_cluster() -> AuthzResult<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST").ok();
        let port = std::env::var("KUBERNETES_SERVICE_PORT").ok();
        let (Some(host), Some(port)) = (host, port) else {
            return Err(AuthzError::config(
                "unable to load in-cluster configuration, KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be defined",
            ));
        };

        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        let token = std::fs::read_to_string(dir.join("token"))?;
        let ca_pem = std::fs::read(dir.join("ca.crt"))?;

        let host = if host.contains(':') {
            format!("[{host}]")
        } else {
            host
        };

        Ok(Self {
            token: Some(token.trim().to_string()),
            ca_pem: Some(ca_pem),
            ..Self::new(format!("https://{host}:{port}"))
        })
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Authenticated JSON client for the Kubernetes API.
#[derive(Debug, Clone)]
pub struct KubeClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl KubeClient {
    /// Creates a client from explicit settings.
    pub fn new(config: &KubeConfig) -> AuthzResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.timeout);
        if let Some(ca) = &config.ca_pem {
            let cert = reqwest::Certificate::from_pem(ca)
                .map_err(|e| AuthzError::config(format!("invalid cluster CA: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| AuthzError::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.api_url.clone(),
            token: config.token.clone(),
            client,
        })
    }

    /// Creates a client from the pod's service account.
    pub fn in_cluster() -> AuthzResult<Self> {
        Self::new(&KubeConfig::in_cluster()?)
    }

    /// GETs `path` and decodes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AuthzResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct ClusterRoleBindingList {
    #[serde(default)]
    items: Vec<ClusterRoleBinding>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterRoleBinding {
    #[serde(default)]
    subjects: Option<Vec<Subject>>,
    role_ref: RoleRef,
}

#[derive(Debug, Deserialize)]
struct Subject {
    kind: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RoleRef {
    name: String,
}

/// Reads cluster role bindings from the Kubernetes API.
#[derive(Debug, Clone)]
pub struct KubeRoleBindings {
    client: Arc<KubeClient>,
}

impl KubeRoleBindings {
    /// Creates a lookup over `client`.
    pub fn new(client: Arc<KubeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RoleBindingLookup for KubeRoleBindings {
    async fn list_role_bindings(&self) -> AuthzResult<Vec<RoleBinding>> {
        let list: ClusterRoleBindingList = self.client.get_json(CLUSTER_ROLE_BINDINGS_PATH).await?;

        let bindings: Vec<RoleBinding> = list
            .items
            .into_iter()
            .flat_map(|crb| {
                let role = crb.role_ref.name;
                crb.subjects
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |s| RoleBinding::new(s.kind, s.name, role.clone()))
            })
            .collect();

        debug!(count = bindings.len(), "Listed cluster role bindings");
        Ok(bindings)
    }
}
