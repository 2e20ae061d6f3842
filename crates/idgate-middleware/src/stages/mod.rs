//! Pipeline stage implementations.
//!
//! | Stage | Middleware                   | Terminates with         |
//! |-------|------------------------------|-------------------------|
//! | 1     | [`LoggingMiddleware`]        | never                   |
//! | 2     | [`AuthenticationMiddleware`] | 401                     |
//! | 3     | [`AuthorizationMiddleware`]  | 403, 500                |
//! | 4     | [`UserBodyMiddleware`]       | 400, 500                |

mod authentication;
mod authorization;
mod logging;
mod user_body;

pub use authentication::AuthenticationMiddleware;
pub use authorization::AuthorizationMiddleware;
pub use logging::{LoggingMiddleware, REQUEST_ID_HEADER};
pub use user_body::UserBodyMiddleware;

use crate::context::GatewayContext;
use crate::pipeline::Stage;
use crate::types::{Response, ResponseExt};
use idgate_core::GatewayError;
use idgate_telemetry::record_rejection;
use tracing::{error, warn};

/// Builds the terminal response of a stage that rejects the request.
pub(crate) fn reject(ctx: &GatewayContext, stage: Stage, err: &GatewayError) -> Response {
    if err.status_code().is_server_error() {
        error!(stage = stage.name(), reason = err.reason(), error = %err, "Request rejected");
    } else {
        warn!(stage = stage.name(), reason = err.reason(), error = %err, "Request rejected");
    }
    record_rejection(stage.name(), err.reason());
    Response::from_gateway_error(err, Some(&ctx.request_id().to_string()))
}
