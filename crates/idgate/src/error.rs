//! Error types for the gateway server.

use http::StatusCode;
use idgate_authn::AuthError;
use idgate_authz::AuthzError;
use idgate_telemetry::TelemetryError;
use thiserror::Error;

/// Errors raised while starting or running the gateway.
///
/// Pipeline rejections are not represented here; stages turn those into
/// responses themselves.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Upstream TLS credentials could not be loaded.
    #[error("TLS error: {message}")]
    Tls {
        /// Error message.
        message: String,
    },

    /// The backend could not be reached or answered unreadably.
    #[error("Upstream error: {message}")]
    Upstream {
        /// Error message.
        message: String,
    },

    /// Listener setup failed.
    #[error("Server error: {message}")]
    Server {
        /// Error message.
        message: String,
    },

    /// Token verifier construction failed.
    #[error("Authentication setup failed: {0}")]
    Auth(#[from] AuthError),

    /// Role lookup client construction failed.
    #[error("Authorization setup failed: {0}")]
    Authz(#[from] AuthzError),

    /// Logging or metrics setup failed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a TLS error.
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls {
            message: message.into(),
        }
    }

    /// Create an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    /// Returns the HTTP status a request would get for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error category for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Tls { .. } => "tls",
            Self::Upstream { .. } => "upstream",
            Self::Server { .. } => "server",
            Self::Auth(_) => "authentication",
            Self::Authz(_) => "authorization",
            Self::Telemetry(_) => "telemetry",
            Self::Io(_) => "io",
        }
    }
}

/// Result type for gateway server operations.
pub type ServerResult<T> = Result<T, ServerError>;
