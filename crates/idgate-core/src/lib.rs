//! # Idgate Core
//!
//! Core types shared by every idgate crate:
//!
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Identity`] - Authenticated caller identity (email and groups)
//! - [`RequestKind`] - Closed set of request kinds the gateway treats specially
//! - [`GatewayError`] - Pipeline error taxonomy with HTTP status mapping
//! - [`CreateUserPayload`] / [`UpdateUserPayload`] - Wire bodies of the user-mutation routes

#![doc(html_root_url = "https://docs.rs/idgate-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod identity;
mod kind;
pub mod payload;

pub use context::RequestId;
pub use error::{ErrorCategory, ErrorResponse, GatewayError, GatewayResult};
pub use identity::Identity;
pub use kind::RequestKind;
pub use payload::{CreateUserPayload, UpdateUserPayload};
