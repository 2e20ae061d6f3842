//! # Idgate Middleware
//!
//! The request pipeline every routed request flows through before it is
//! dispatched to the backend.
//!
//! ```text
//! Request → Logging → Authentication → Authorization → BodyTransform → Dispatch
//!              ↑            │ 401            │ 403/500        │ 400/500
//! Response ←───┴────────────┴────────────────┴────────────────┘
//! ```
//!
//! | Stage | Middleware       | Purpose                                          |
//! |-------|------------------|--------------------------------------------------|
//! | 1     | Logging          | Request span, entry/exit logs, metrics           |
//! | 2     | Authentication   | Bearer token to verified caller identity         |
//! | 3     | Authorization    | Caller's bound roles against the allow-list      |
//! | 4     | Body Transform   | Validate, hash password, assign user id          |
//!
//! A stage either passes the request on or returns the terminal response
//! itself; nothing after a terminating stage runs. Stages 2 and 3 are left
//! out together when authentication is disabled.
//!
//! ## Example
//!
//! ```
//! use idgate_middleware::pipeline::{Pipeline, Stage};
//! use idgate_middleware::PasswordHasher;
//!
//! let stages = Stage::all();
//! assert_eq!(stages[0].name(), "logging");
//! assert_eq!(stages[3].name(), "body_transform");
//!
//! let pipeline = Pipeline::standard(None, PasswordHasher::default());
//! assert_eq!(pipeline.stage_names(), vec!["logging", "body_transform"]);
//! ```

#![doc(html_root_url = "https://docs.rs/idgate-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod classify;
pub mod context;
mod hasher;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;
pub mod validate;

pub use classify::classify;
pub use context::{GatewayContext, RouteInfo};
pub use hasher::{PasswordHasher, MAX_COST, MAX_PASSWORD_BYTES, MIN_COST};
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{AuthStages, Pipeline, PipelineBuilder, Stage};
pub use stages::REQUEST_ID_HEADER;
pub use types::{Request, Response, ResponseExt};
