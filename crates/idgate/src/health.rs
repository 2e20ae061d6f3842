//! Liveness and readiness reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Health status of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving.
    Healthy,
    /// Not serving.
    Unhealthy,
}

impl HealthStatus {
    /// Check if the status indicates the service is operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Readiness status of the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    /// Accepting traffic.
    Ready,
    /// Starting up or shutting down.
    NotReady,
}

impl ReadinessStatus {
    /// Check if the gateway is ready.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall health status.
    pub status: HealthStatus,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Version information.
    pub version: String,
}

/// Readiness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Overall readiness status.
    pub status: ReadinessStatus,
    /// Individual check results.
    pub checks: Vec<CheckResult>,
}

/// Result of a single readiness check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Whether the check passed.
    pub passed: bool,
    /// Optional message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            message: None,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            message: Some(message.into()),
        }
    }

    /// Set the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Tracks uptime and whether the listener is accepting traffic.
#[derive(Debug)]
pub struct HealthChecker {
    start_time: Instant,
    ready: AtomicBool,
    auth_enabled: bool,
}

impl HealthChecker {
    /// Create a new health checker. It starts not ready.
    pub fn new(auth_enabled: bool) -> Self {
        Self {
            start_time: Instant::now(),
            ready: AtomicBool::new(false),
            auth_enabled,
        }
    }

    /// Set the ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if the gateway is ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Get uptime.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Liveness: the process is up.
    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            uptime_seconds: self.uptime().as_secs(),
            version: crate::VERSION.to_string(),
        }
    }

    /// Readiness: the listener is bound and not draining.
    pub fn readiness(&self) -> ReadinessResponse {
        let listener = if self.is_ready() {
            CheckResult::pass("listener")
        } else {
            CheckResult::fail("listener", "not accepting connections")
        };

        let auth = CheckResult::pass("auth").with_message(if self.auth_enabled {
            "enabled"
        } else {
            "disabled"
        });

        let status = if listener.passed {
            ReadinessStatus::Ready
        } else {
            ReadinessStatus::NotReady
        };

        ReadinessResponse {
            status,
            checks: vec![listener, auth],
        }
    }
}
