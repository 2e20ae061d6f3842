//! Bearer token authentication.
//!
//! Extracts the bearer token, verifies it and stores the caller identity on
//! the context for the authorization stage. Every failure terminates the
//! request with 401.

use crate::{
    context::GatewayContext,
    middleware::{BoxFuture, Middleware, Next},
    pipeline::Stage,
    stages::reject,
    types::{Request, Response},
};
use idgate_authn::{extract_bearer, Authenticator};
use idgate_core::GatewayError;
use tracing::debug;

/// Second pipeline stage.
#[derive(Debug, Clone)]
pub struct AuthenticationMiddleware {
    authenticator: Authenticator,
}

impl AuthenticationMiddleware {
    /// Creates the stage over `authenticator`.
    pub fn new(authenticator: Authenticator) -> Self {
        Self { authenticator }
    }
}

impl Middleware for AuthenticationMiddleware {
    fn name(&self) -> &'static str {
        Stage::Authentication.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let token = match extract_bearer(request.headers()) {
                Ok(token) => token.to_string(),
                Err(e) => return reject(ctx, Stage::Authentication, &GatewayError::from(e)),
            };

            match self.authenticator.authenticate(&token).await {
                Ok(identity) => {
                    debug!(caller = %identity.email(), "Authenticated");
                    ctx.set_identity(identity);
                    next.run(ctx, request).await
                }
                Err(e) => reject(ctx, Stage::Authentication, &GatewayError::from(e)),
            }
        })
    }
}
