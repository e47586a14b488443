//! Metrics for the route manager core.
pub mod events;

use crate::types::RouteState;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Health status for the service
#[derive(Debug, Clone, Copy)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Metrics registry wrapper: Routes by state, lifecycle transitions, and
/// renewal outcomes.
pub struct MetricsRegistry {
    registry: Registry,
    routes_by_state: IntGaugeVec,
    transitions_total: IntCounterVec,
    renewals_succeeded: IntCounter,
    renewals_failed: IntCounter,
}

impl MetricsRegistry {
    pub fn new(prefix: &str) -> Self {
        let registry = Registry::new();

        let routes_by_state = IntGaugeVec::new(
            Opts::new(format!("{prefix}_routes_by_state"), "Routes currently in each lifecycle state"),
            &["state"],
        )
        .expect("static metric definition");
        let transitions_total = IntCounterVec::new(
            Opts::new(format!("{prefix}_transitions_total"), "Route state transitions performed"),
            &["to_state"],
        )
        .expect("static metric definition");
        let renewals_succeeded = IntCounter::new(
            format!("{prefix}_renewals_succeeded_total"),
            "Certificate renewals that completed successfully",
        )
        .expect("static metric definition");
        let renewals_failed = IntCounter::new(
            format!("{prefix}_renewals_failed_total"),
            "Certificate renewals that failed",
        )
        .expect("static metric definition");

        registry
            .register(Box::new(routes_by_state.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(transitions_total.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(renewals_succeeded.clone()))
            .expect("metric registration");
        registry
            .register(Box::new(renewals_failed.clone()))
            .expect("metric registration");

        Self {
            registry,
            routes_by_state,
            transitions_total,
            renewals_succeeded,
            renewals_failed,
        }
    }

    /// Records that a Route just transitioned from `from` into `to`:
    /// decrements the prior state's gauge, increments the new state's gauge,
    /// and bumps the transitions counter. `from` is `None` for a freshly
    /// created Route, which has no prior state to vacate.
    pub fn record_transition(&self, from: Option<RouteState>, to: RouteState) {
        if let Some(from) = from {
            self.routes_by_state.with_label_values(&[from.as_str()]).dec();
        }
        self.routes_by_state.with_label_values(&[to.as_str()]).inc();
        self.transitions_total.with_label_values(&[to.as_str()]).inc();
    }

    pub fn record_renewal_success(&self) {
        self.renewals_succeeded.inc();
    }

    pub fn record_renewal_failure(&self) {
        self.renewals_failed.inc();
    }

    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&mf, &mut buffer).expect("prometheus text encoding");
        String::from_utf8_lossy(&buffer).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new("routex")
    }
}

/// Health check response
pub fn health_status(status: HealthStatus) -> (&'static str, u16) {
    match status {
        HealthStatus::Healthy => ("ok", 200),
        HealthStatus::Degraded => ("degraded", 200),
        HealthStatus::Unhealthy => ("unhealthy", 503),
    }
}

/// Shared metrics type
pub type SharedMetrics = Arc<MetricsRegistry>;
