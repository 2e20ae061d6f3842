//! HTTP types used throughout the pipeline.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use idgate_core::{ErrorResponse, GatewayError};

/// The HTTP request type used in the pipeline.
///
/// Bodies are buffered before the pipeline runs, so stages can decode and
/// replace them.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the pipeline.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building error responses.
pub trait ResponseExt {
    /// Creates a JSON error response from an envelope.
    fn json_error(status: StatusCode, body: &ErrorResponse) -> Response;

    /// Creates the terminal response for a rejected request.
    fn from_gateway_error(err: &GatewayError, request_id: Option<&str>) -> Response;
}

impl ResponseExt for Response {
    fn json_error(status: StatusCode, body: &ErrorResponse) -> Response {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        let mut response = Response::new(Full::new(Bytes::from(bytes)));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn from_gateway_error(err: &GatewayError, request_id: Option<&str>) -> Response {
        Self::json_error(err.status_code(), &err.to_response(request_id))
    }
}
