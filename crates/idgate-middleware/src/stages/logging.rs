//! Request logging middleware.
//!
//! Opens the per-request span every later log line is recorded in, logs
//! `METHOD path` on entry and the outcome on exit, and records the request
//! metrics. Request bodies are never logged.

use crate::{
    context::GatewayContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};
use http::header::HeaderValue;
use idgate_telemetry::record_request;
use tracing::{error, info, info_span, Instrument};

/// Response header carrying the request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// First pipeline stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Creates the logging stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = ctx.request_id();
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let kind = ctx.request_kind(&method);

            let span = info_span!(
                "request",
                request_id = %request_id,
                http.method = %method,
                http.path = %path,
                request_kind = kind.name(),
            );

            let mut response = async {
                info!("{method} {path}");
                next.run(ctx, request).await
            }
            .instrument(span.clone())
            .await;

            let status = response.status();
            let duration = ctx.elapsed();
            let duration_ms = duration.as_secs_f64() * 1000.0;
            record_request(kind.name(), status.as_u16(), duration);

            span.in_scope(|| {
                if status.as_u16() == 200 {
                    info!(http.status_code = status.as_u16(), duration_ms, "Request completed");
                } else {
                    error!(http.status_code = status.as_u16(), duration_ms, "Request failed");
                }
            });

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}
