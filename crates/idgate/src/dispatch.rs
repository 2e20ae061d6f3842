//! Forwarding of pipeline output to the backend.

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use idgate_core::{ErrorResponse, RequestId};
use idgate_middleware::{Request, Response, ResponseExt, REQUEST_ID_HEADER};
use reqwest::Client;
use tracing::{debug, error};

use crate::config::UpstreamSettings;
use crate::error::{ServerError, ServerResult};
use crate::tls::TlsMaterial;

/// Sends requests to the backend's HTTP/JSON endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamDispatcher {
    client: Client,
    base_url: String,
    route_prefix: String,
    timeout: Duration,
}

impl UpstreamDispatcher {
    /// Creates a dispatcher, with client TLS when `tls` is given.
    pub fn new(settings: &UpstreamSettings, tls: Option<&TlsMaterial>) -> ServerResult<Self> {
        let mut builder = Client::builder()
            .timeout(settings.timeout)
            .pool_max_idle_per_host(100);
        if let Some(tls) = tls {
            builder = tls.apply(builder)?;
        }
        let client = builder
            .build()
            .map_err(|e| ServerError::upstream(format!("failed to create client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url(),
            route_prefix: String::new(),
            timeout: settings.timeout,
        })
    }

    /// Strips `prefix` from request paths before they reach the backend.
    #[must_use]
    pub fn with_route_prefix(mut self, prefix: &str) -> Self {
        self.route_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    /// Get the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forwards `request` and converts the backend's answer into a response.
    ///
    /// Backend failures become a 502 carrying `request_id`.
    pub async fn forward(&self, request: Request, request_id: RequestId) -> Response {
        match self.send(request, request_id).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Upstream request failed");
                let body = ErrorResponse::new(
                    StatusCode::BAD_GATEWAY
                        .canonical_reason()
                        .unwrap_or("Bad Gateway"),
                    "upstream request failed",
                )
                .with_request_id(request_id.to_string());
                Response::json_error(StatusCode::BAD_GATEWAY, &body)
            }
        }
    }

    async fn send(&self, request: Request, request_id: RequestId) -> ServerResult<Response> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let path = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        let url = format!("{}{}", self.base_url, self.backend_path(path));

        let mut headers = filter_request_headers(&parts.headers);
        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }

        debug!(method = %parts.method, url = %url, "Forwarding to upstream");

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| ServerError::upstream(format!("request failed: {e}")))?;

        let status = upstream.status();
        let upstream_headers = upstream.headers().clone();
        let body: Bytes = upstream
            .bytes()
            .await
            .map_err(|e| ServerError::upstream(format!("failed to read body: {e}")))?;

        let mut response = Response::new(Full::new(body));
        *response.status_mut() = status;
        for (name, value) in &upstream_headers {
            if !is_hop_by_hop_header(name) && name != http::header::CONTENT_LENGTH {
                response.headers_mut().append(name.clone(), value.clone());
            }
        }
        Ok(response)
    }

    /// Maps a gateway path to the backend path by dropping the route prefix.
    fn backend_path<'a>(&self, path: &'a str) -> &'a str {
        if self.route_prefix.is_empty() {
            return path;
        }
        match path.strip_prefix(self.route_prefix.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }
}

/// Copies the headers the backend should see.
///
/// Hop-by-hop headers, the caller's credential, `host`, `content-length` and
/// any incoming request id are left out.
pub fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if is_hop_by_hop_header(name)
            || name == http::header::AUTHORIZATION
            || name == http::header::HOST
            || name == http::header::CONTENT_LENGTH
            || name.as_str() == REQUEST_ID_HEADER
        {
            continue;
        }
        filtered.append(name.clone(), value.clone());
    }
    filtered
}

/// Check if a header is hop-by-hop (should not be forwarded).
fn is_hop_by_hop_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "trailers"
            | "transfer-encoding"
            | "upgrade"
    )
}
