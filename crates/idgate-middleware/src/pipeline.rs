//! Fixed-order request pipeline.
//!
//! ## Stages
//!
//! 1. **Logging** - Per-request span, entry and exit logs, request metrics
//! 2. **Authentication** - Bearer token to caller identity
//! 3. **Authorization** - Caller roles against the allow-list
//! 4. **Body Transform** - Validate and rewrite user-mutation bodies
//!
//! The dispatcher runs after the last stage. Authentication and
//! authorization can be left out together, never one without the other.

use crate::context::GatewayContext;
use crate::hasher::PasswordHasher;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::{
    AuthenticationMiddleware, AuthorizationMiddleware, LoggingMiddleware, UserBodyMiddleware,
};
use crate::types::{Request, Response};
use idgate_authn::Authenticator;
use idgate_authz::Authorizer;
use std::sync::Arc;

/// A type-erased stage that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The collaborators of the authentication and authorization stages.
#[derive(Debug, Clone)]
pub struct AuthStages {
    /// Token verification.
    pub authenticator: Authenticator,
    /// Role-binding check.
    pub authorizer: Authorizer,
}

/// The request pipeline.
///
/// Immutable once built and shared by every connection.
///
/// # Example
///
/// ```ignore
/// use idgate_middleware::{AuthStages, PasswordHasher, Pipeline};
///
/// let pipeline = Pipeline::standard(Some(AuthStages { authenticator, authorizer }), PasswordHasher::default());
/// assert_eq!(pipeline.stage_names(), ["logging", "authentication", "authorization", "body_transform"]);
///
/// let response = pipeline.process(ctx, request, |ctx, req| dispatcher.dispatch(ctx, req)).await;
/// ```
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Builds the gateway pipeline.
    ///
    /// With `auth` set to `None` the authentication and authorization
    /// stages are left out; logging and body transformation always run.
    pub fn standard(auth: Option<AuthStages>, hasher: PasswordHasher) -> Self {
        let mut builder = Self::builder().add_stage(LoggingMiddleware::new());
        if let Some(auth) = auth {
            builder = builder
                .add_stage(AuthenticationMiddleware::new(auth.authenticator))
                .add_stage(AuthorizationMiddleware::new(auth.authorizer));
        }
        builder.add_stage(UserBodyMiddleware::new(hasher)).build()
    }

    /// Runs a request through every stage, then `handler`.
    pub async fn process<H>(&self, mut ctx: GatewayContext, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        let next = self.build_chain(handler);
        next.run(&mut ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage; stages run in the order they are added.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Pipeline stage marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: request logging
    Logging = 1,
    /// Stage 2: bearer token verification
    Authentication = 2,
    /// Stage 3: role-binding check
    Authorization = 3,
    /// Stage 4: user-mutation body rewrite
    BodyTransform = 4,
}

impl Stage {
    /// Returns true for the stages the auth flag switches off.
    #[must_use]
    pub const fn is_auth(self) -> bool {
        matches!(self, Self::Authentication | Self::Authorization)
    }

    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Logging => "logging",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::BodyTransform => "body_transform",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 4] {
        [
            Self::Logging,
            Self::Authentication,
            Self::Authorization,
            Self::BodyTransform,
        ]
    }
}
