//! Prometheus metrics.
//!
//! The recorder is installed once per process; its handle is returned to
//! the caller, which serves [`PrometheusHandle::render`] on its own
//! endpoint instead of opening a separate listener.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Total requests counter.
pub const REQUESTS_TOTAL: &str = "idgate_requests_total";
/// Request duration histogram.
pub const REQUEST_DURATION: &str = "idgate_request_duration_seconds";
/// Stage rejections counter.
pub const REJECTIONS_TOTAL: &str = "idgate_rejections_total";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Histogram buckets for request duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            // bcrypt dominates user mutations, so the upper buckets matter
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

impl MetricsConfig {
    fn builder(&self) -> TelemetryResult<PrometheusBuilder> {
        PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full(REQUEST_DURATION.to_string()),
                &self.duration_buckets,
            )
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))
    }
}

/// Installs the global Prometheus recorder and returns its handle.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if the buckets are empty or a
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<PrometheusHandle> {
    let handle = config
        .builder()?
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    register_metric_descriptions();
    Ok(handle)
}

fn register_metric_descriptions() {
    describe_counter!(
        REQUESTS_TOTAL,
        "Total number of requests that went through the pipeline"
    );
    describe_histogram!(
        REQUEST_DURATION,
        "Pipeline duration in seconds, upstream call included"
    );
    describe_counter!(
        REJECTIONS_TOTAL,
        "Requests terminated by a pipeline stage, by stage and reason"
    );
}

/// Records a completed request.
pub fn record_request(kind: &str, status_code: u16, duration: Duration) {
    counter!(
        REQUESTS_TOTAL,
        "kind" => kind.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION, "kind" => kind.to_string()).record(duration.as_secs_f64());
}

/// Records a request terminated by `stage` for `reason`.
pub fn record_rejection(stage: &'static str, reason: &'static str) {
    counter!(REJECTIONS_TOTAL, "stage" => stage, "reason" => reason).increment(1);
}
