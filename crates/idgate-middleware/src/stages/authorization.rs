//! Role-binding authorization.
//!
//! Reads the identity the authentication stage stored on the context and
//! checks the caller's bound roles against the allow-list.

use crate::{
    context::GatewayContext,
    middleware::{BoxFuture, Middleware, Next},
    pipeline::Stage,
    stages::reject,
    types::{Request, Response},
};
use idgate_authz::Authorizer;
use idgate_core::GatewayError;

/// Third pipeline stage.
#[derive(Debug, Clone)]
pub struct AuthorizationMiddleware {
    authorizer: Authorizer,
}

impl AuthorizationMiddleware {
    /// Creates the stage over `authorizer`.
    pub fn new(authorizer: Authorizer) -> Self {
        Self { authorizer }
    }
}

impl Middleware for AuthorizationMiddleware {
    fn name(&self) -> &'static str {
        Stage::Authorization.name()
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            // only reachable without identity if the stages were misassembled
            let Some(identity) = ctx.identity().cloned() else {
                return reject(
                    ctx,
                    Stage::Authorization,
                    &GatewayError::internal("no caller identity on the request context"),
                );
            };

            match self.authorizer.authorize(&identity).await {
                Ok(true) => next.run(ctx, request).await,
                Ok(false) => reject(
                    ctx,
                    Stage::Authorization,
                    &GatewayError::forbidden(identity.email()),
                ),
                Err(e) => reject(ctx, Stage::Authorization, &GatewayError::from(e)),
            }
        })
    }
}
