//! Core middleware trait and types.
//!
//! Every pipeline stage implements [`Middleware`]. A stage receives the
//! request context, the request and a [`Next`] callback; it either calls
//! `next.run` to continue or returns its own response to terminate the
//! request.
//!
//! # Example
//!
//! ```ignore
//! use idgate_middleware::{BoxFuture, GatewayContext, Middleware, Next, Request, Response};
//!
//! struct Timing;
//!
//! impl Middleware for Timing {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut GatewayContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(ctx, request).await;
//!             tracing::debug!(elapsed = ?ctx.elapsed(), "done");
//!             response
//!         })
//!     }
//! }
//! ```

use crate::context::GatewayContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pipeline stage.
///
/// # Invariants
///
/// - A stage calls `next.run()` at most once
/// - A stage that does not call `next.run()` returns the terminal response
/// - Once a stage terminates, no later stage and no upstream call runs
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Processes the request.
    fn process<'a>(
        &'a self,
        ctx: &'a mut GatewayContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Callback to invoke the rest of the chain.
///
/// Consumed by [`Next::run`], so the rest of the chain runs at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain: the dispatcher.
    Handler(Box<dyn FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'a>),
}

impl<'a> Next<'a> {
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage, or the dispatcher at the end of the chain.
    pub async fn run(self, ctx: &mut GatewayContext, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(ctx, request, *next).await
            }
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingMiddleware {
        calls: Arc<AtomicUsize>,
        terminate: bool,
    }

    impl Middleware for CountingMiddleware {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut GatewayContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if self.terminate {
                    return HttpResponse::builder()
                        .status(StatusCode::FORBIDDEN)
                        .body(Full::new(Bytes::new()))
                        .unwrap();
                }
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn ok_handler(
        hits: Arc<AtomicUsize>,
    ) -> impl FnOnce(&mut GatewayContext, Request) -> BoxFuture<'static, Response> + Send {
        move |_ctx, _req| {
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
                HttpResponse::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from("OK")))
                    .unwrap()
            })
        }
    }

    #[tokio::test]
    async fn test_next_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut ctx = GatewayContext::new();

        let response = Next::handler(ok_handler(hits.clone()))
            .run(&mut ctx, request())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chain_runs_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hits = Arc::new(AtomicUsize::new(0));
        let first = CountingMiddleware {
            calls: calls.clone(),
            terminate: false,
        };
        let second = CountingMiddleware {
            calls: calls.clone(),
            terminate: false,
        };

        let mut ctx = GatewayContext::new();
        let next = Next::new(&first, Next::new(&second, Next::handler(ok_handler(hits.clone()))));
        let response = next.run(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminating_stage_skips_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hits = Arc::new(AtomicUsize::new(0));
        let gate = CountingMiddleware {
            calls: calls.clone(),
            terminate: true,
        };
        let after = CountingMiddleware {
            calls: calls.clone(),
            terminate: false,
        };

        let mut ctx = GatewayContext::new();
        let next = Next::new(&gate, Next::new(&after, Next::handler(ok_handler(hits.clone()))));
        let response = next.run(&mut ctx, request()).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
