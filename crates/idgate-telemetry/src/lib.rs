//! Logging and metrics for the idgate gateway.
//!
//! - **Logging**: `tracing` events rendered by `tracing-subscriber`, JSON in
//!   production and pretty-printed in development.
//! - **Metrics**: Prometheus-format metrics via the `metrics` facade. The
//!   gateway serves the rendering on its internal metrics endpoint.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `idgate_requests_total` | Counter | `kind`, `status` | Requests through the pipeline |
//! | `idgate_request_duration_seconds` | Histogram | `kind` | Pipeline latency |
//! | `idgate_rejections_total` | Counter | `stage`, `reason` | Requests terminated by a stage |
//!
//! # Example
//!
//! ```rust,ignore
//! use idgate_telemetry::{init_logging, init_metrics, LogConfig, MetricsConfig};
//!
//! init_logging(&LogConfig::production())?;
//! let handle = init_metrics(&MetricsConfig::default())?;
//! println!("{}", handle.render());
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, record_rejection, record_request, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
