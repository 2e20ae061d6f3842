//! Error types for the idgate pipeline.
//!
//! Every stage that rejects a request expresses the rejection as a
//! [`GatewayError`]. The error knows its HTTP status and the message that
//! is safe to show to the client; the stage turns it into the terminal
//! response itself.
//!
//! | Variant               | Status |
//! |-----------------------|--------|
//! | `MissingCredential`   | 401    |
//! | `MalformedCredential` | 401    |
//! | `InvalidCredential`   | 401    |
//! | `UnverifiedIdentity`  | 401    |
//! | `LookupFailed`        | 500    |
//! | `Forbidden`           | 403    |
//! | `MalformedBody`       | 400    |
//! | `Validation`          | 400    |
//! | `Internal`            | 500    |

use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`GatewayError`].
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Broad error categories, used for metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Missing, malformed or rejected credentials.
    Authentication,
    /// Valid identity without a permitted role.
    Authorization,
    /// Undecodable or invalid request body.
    Validation,
    /// Failures on the gateway side.
    Internal,
}

impl ErrorCategory {
    /// Returns the label value for this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::Internal => "internal",
        }
    }
}

/// A request rejected by one of the pipeline stages.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No `Authorization` header was sent.
    #[error("authorization header not found")]
    MissingCredential,

    /// The `Authorization` header is not `Bearer <token>`.
    #[error("invalid authorization header format")]
    MalformedCredential,

    /// The token failed signature, expiry or audience checks.
    #[error("could not verify bearer token: {message}")]
    InvalidCredential {
        /// Why verification failed.
        message: String,
    },

    /// The token is valid but its email has not been verified.
    #[error("email ({email:?}) in returned claims was not verified")]
    UnverifiedIdentity {
        /// The unverified email claim.
        email: String,
    },

    /// The role-binding lookup failed.
    #[error("failed to get cluster roles for the user: {message}")]
    LookupFailed {
        /// Why the lookup failed.
        message: String,
    },

    /// The caller holds none of the allowed roles.
    #[error("user {email} holds none of the allowed roles")]
    Forbidden {
        /// The rejected caller.
        email: String,
    },

    /// The request body could not be decoded.
    #[error("{message}")]
    MalformedBody {
        /// Decoder message.
        message: String,
    },

    /// A body field violated a validation rule.
    #[error("{message}")]
    Validation {
        /// The first violation found.
        message: String,
    },

    /// Hashing, encoding or another gateway-side failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message (not exposed to clients).
        message: String,
    },
}

impl GatewayError {
    /// Creates an invalid credential error.
    pub fn invalid_credential(message: impl Into<String>) -> Self {
        Self::InvalidCredential {
            message: message.into(),
        }
    }

    /// Creates an unverified identity error.
    pub fn unverified(email: impl Into<String>) -> Self {
        Self::UnverifiedIdentity {
            email: email.into(),
        }
    }

    /// Creates a lookup failure.
    pub fn lookup_failed(message: impl Into<String>) -> Self {
        Self::LookupFailed {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(email: impl Into<String>) -> Self {
        Self::Forbidden {
            email: email.into(),
        }
    }

    /// Creates a malformed body error.
    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::MalformedBody {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[allow(clippy::match_same_arms)]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingCredential
            | Self::MalformedCredential
            | Self::InvalidCredential { .. }
            | Self::UnverifiedIdentity { .. } => StatusCode::UNAUTHORIZED,
            Self::LookupFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::MalformedBody { .. } | Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error category.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingCredential
            | Self::MalformedCredential
            | Self::InvalidCredential { .. }
            | Self::UnverifiedIdentity { .. } => ErrorCategory::Authentication,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::MalformedBody { .. } | Self::Validation { .. } => ErrorCategory::Validation,
            Self::LookupFailed { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns a short machine-readable reason, used as a metric label.
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MalformedCredential => "malformed_credential",
            Self::InvalidCredential { .. } => "invalid_credential",
            Self::UnverifiedIdentity { .. } => "unverified_identity",
            Self::LookupFailed { .. } => "lookup_failed",
            Self::Forbidden { .. } => "forbidden",
            Self::MalformedBody { .. } => "malformed_body",
            Self::Validation { .. } => "validation",
            Self::Internal { .. } => "internal",
        }
    }

    /// Returns the message that may be shown to the client.
    ///
    /// Credential and lookup failures only expose the status reason; body
    /// errors carry their message so the caller can correct the input.
    pub fn client_message(&self) -> String {
        match self {
            Self::MalformedBody { .. } | Self::Validation { .. } => self.to_string(),
            other => other
                .status_code()
                .canonical_reason()
                .unwrap_or("error")
                .to_string(),
        }
    }

    /// Converts this error into the JSON body sent to the client.
    pub fn to_response(&self, request_id: Option<&str>) -> ErrorResponse {
        let status = self.status_code();
        let response = ErrorResponse::new(
            status.canonical_reason().unwrap_or("error"),
            self.client_message(),
        );
        match request_id {
            Some(id) => response.with_request_id(id),
            None => response,
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status reason phrase.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            request_id: None,
        }
    }

    /// Set the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error, self.message)
    }
}
