//! Gateway HTTP server.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use idgate_authn::{Authenticator, OidcConfig, OidcVerifier};
use idgate_authz::{Authorizer, KubeClient, KubeRoleBindings, RoleAllowList};
use idgate_core::{ErrorResponse, RequestId};
use idgate_middleware::{
    AuthStages, GatewayContext, PasswordHasher, Pipeline, Request, Response, ResponseExt,
    RouteInfo, REQUEST_ID_HEADER,
};
use idgate_router::{Resolution, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::config::{GatewayConfig, TlsSource};
use crate::dispatch::UpstreamDispatcher;
use crate::error::{ServerError, ServerResult};
use crate::health::HealthChecker;
use crate::routes::gateway_routes;
use crate::tls::TlsMaterial;

/// Prefix of the gateway's own endpoints. They bypass the pipeline.
pub const INTERNAL_PREFIX: &str = "/_idgate/";

struct AppState {
    router: Router,
    pipeline: Pipeline,
    dispatcher: Arc<UpstreamDispatcher>,
    health: HealthChecker,
    metrics: Option<PrometheusHandle>,
    max_body_size: usize,
}

/// Gateway server.
pub struct GatewayServer {
    config: Arc<GatewayConfig>,
    state: Arc<AppState>,
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("stages", &self.state.pipeline.stage_names())
            .field("upstream", &self.state.dispatcher.base_url())
            .finish_non_exhaustive()
    }
}

impl GatewayServer {
    /// Assembles a server from already-built collaborators.
    ///
    /// `auth` must be `Some` exactly when the configuration enables auth.
    pub fn new(
        config: GatewayConfig,
        auth: Option<AuthStages>,
        dispatcher: UpstreamDispatcher,
        metrics: Option<PrometheusHandle>,
    ) -> ServerResult<Self> {
        if config.auth.enabled != auth.is_some() {
            return Err(ServerError::config(
                "auth stages must be supplied exactly when auth is enabled",
            ));
        }

        let hasher = PasswordHasher::new(config.password.bcrypt_cost)
            .map_err(|e| ServerError::config(e.to_string()))?;
        let pipeline = Pipeline::standard(auth, hasher);
        let router = gateway_routes(&config.server.route_prefix);

        let state = AppState {
            router,
            pipeline,
            dispatcher: Arc::new(dispatcher.with_route_prefix(&config.server.route_prefix)),
            health: HealthChecker::new(config.auth.enabled),
            metrics,
            max_body_size: config.server.max_request_body_size,
        };

        Ok(Self {
            config: Arc::new(config),
            state: Arc::new(state),
        })
    }

    /// Builds every collaborator the configuration asks for.
    ///
    /// With auth enabled, failing to reach the cluster API configuration is
    /// fatal.
    pub async fn from_config(
        config: GatewayConfig,
        metrics: Option<PrometheusHandle>,
    ) -> ServerResult<Self> {
        config.validate()?;

        let kube = if config.auth.enabled
            || matches!(config.upstream.tls, Some(TlsSource::Secret(_)))
        {
            Some(Arc::new(KubeClient::in_cluster()?))
        } else {
            None
        };

        let auth = match (&kube, config.auth.enabled) {
            (Some(kube), true) => Some(build_auth_stages(&config, Arc::clone(kube))?),
            _ => None,
        };

        let tls = match (&config.upstream.tls, &kube) {
            (Some(TlsSource::Dir(dir)), _) => Some(TlsMaterial::from_dir(dir)?),
            (Some(TlsSource::Secret(reference)), Some(kube)) => {
                Some(TlsMaterial::from_secret(kube, reference).await?)
            }
            (Some(TlsSource::Secret(_)), None) | (None, _) => None,
        };

        let dispatcher = UpstreamDispatcher::new(&config.upstream, tls.as_ref())?;
        Self::new(config, auth, dispatcher, metrics)
    }

    /// Returns the names of the pipeline stages, in order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.state.pipeline.stage_names()
    }

    /// Binds the configured address and serves until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> ServerResult<()> {
        let ip = self
            .config
            .server
            .listen_addr
            .parse()
            .map_err(|e| ServerError::config(format!("invalid listen address: {e}")))?;
        let addr = SocketAddr::new(ip, self.config.server.listen_port);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::server(format!("failed to bind {addr}: {e}")))?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` resolves.
    ///
    /// In-flight requests on accepted connections are not awaited.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        info!("idgate listening on {}", addr);
        info!(
            upstream = %self.state.dispatcher.base_url(),
            stages = ?self.state.pipeline.stage_names(),
            "Forwarding to upstream"
        );

        self.state.health.set_ready(true);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move { Ok::<_, Infallible>(handle_request(&state, req).await) }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer_addr, "Connection error: {}", e);
                }
            });
        }

        self.state.health.set_ready(false);
        Ok(())
    }

    /// Handles a single request without a socket.
    pub async fn handle<B>(&self, request: http::Request<B>) -> Response
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        handle_request(&self.state, request).await
    }
}

fn build_auth_stages(config: &GatewayConfig, kube: Arc<KubeClient>) -> ServerResult<AuthStages> {
    let verifier = OidcVerifier::new(OidcConfig {
        issuer_url: config.auth.issuer_url.clone(),
        jwks_url: config.auth.jwks_url.clone(),
        audience: config.auth.audience.clone(),
        skip_issuer_check: config.auth.skip_issuer_check,
        ..OidcConfig::default()
    })?;
    let authenticator = Authenticator::new(Arc::new(verifier), config.auth.verify_timeout);

    let authorizer = Authorizer::new(
        Arc::new(KubeRoleBindings::new(kube)),
        RoleAllowList::new(config.auth.allowed_roles.iter().cloned()),
        config.auth.lookup_timeout,
    );

    Ok(AuthStages {
        authenticator,
        authorizer,
    })
}

async fn handle_request<B>(state: &AppState, request: http::Request<B>) -> Response
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = request.uri().path().to_string();
    if path.starts_with(INTERNAL_PREFIX) {
        return handle_internal_endpoint(state, request.method(), &path);
    }

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::parse)
        .unwrap_or_default();

    let route = match state.router.resolve(request.method(), &path) {
        Resolution::Matched(m) => RouteInfo::from(m),
        Resolution::MethodNotAllowed(allowed) => {
            debug!(request_id = %request_id, method = %request.method(), path = %path, "Method not allowed");
            let mut response = error_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &format!("method {} not allowed", request.method()),
                request_id,
            );
            let allow = allowed
                .iter()
                .map(Method::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
            return response;
        }
        Resolution::NotFound => {
            debug!(request_id = %request_id, path = %path, "No route");
            return error_response(
                StatusCode::NOT_FOUND,
                &format!("no route for {path}"),
                request_id,
            );
        }
    };

    let (parts, body) = request.into_parts();
    let body = match Limited::new(body, state.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            warn!(request_id = %request_id, limit = state.max_body_size, "Request body too large");
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large",
                request_id,
            );
        }
        Err(e) => {
            warn!(request_id = %request_id, "Failed to read request body: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                "failed to read request body",
                request_id,
            );
        }
    };
    let request = Request::from_parts(parts, Full::new(body));

    let ctx = GatewayContext::with_request_id(request_id).with_route(route);
    let dispatcher = Arc::clone(&state.dispatcher);
    state
        .pipeline
        .process(ctx, request, move |ctx, req| {
            let request_id = ctx.request_id();
            Box::pin(async move { dispatcher.forward(req, request_id).await })
        })
        .await
}

fn handle_internal_endpoint(state: &AppState, method: &Method, path: &str) -> Response {
    if method != Method::GET {
        return error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &format!("method {method} not allowed"),
            RequestId::new(),
        );
    }

    match path.trim_start_matches(INTERNAL_PREFIX) {
        "health" => {
            let response = state.health.liveness();
            let status = if response.status.is_operational() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            json_response(status, &response)
        }
        "ready" => {
            let response = state.health.readiness();
            let status = if response.status.is_ready() {
                StatusCode::OK
            } else {
                StatusCode::SERVICE_UNAVAILABLE
            };
            json_response(status, &response)
        }
        "metrics" => match &state.metrics {
            Some(handle) => {
                let mut response = Response::new(Full::new(Bytes::from(handle.render())));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            None => error_response(
                StatusCode::NOT_FOUND,
                "metrics are disabled",
                RequestId::new(),
            ),
        },
        "version" => {
            let version = serde_json::json!({
                "name": "idgate",
                "version": crate::VERSION,
            });
            json_response(StatusCode::OK, &version)
        }
        _ => error_response(
            StatusCode::NOT_FOUND,
            &format!("unknown internal endpoint: {path}"),
            RequestId::new(),
        ),
    }
}

/// Create a JSON response.
fn json_response<T: serde::Serialize>(status: StatusCode, body: &T) -> Response {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Create an error response carrying the request id in body and header.
fn error_response(status: StatusCode, message: &str, request_id: RequestId) -> Response {
    let id = request_id.to_string();
    let body = ErrorResponse::new(status.canonical_reason().unwrap_or("error"), message)
        .with_request_id(id.clone());
    let mut response = Response::json_error(status, &body);
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
