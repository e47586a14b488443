use crate::types::RouteState;
use serde::Serialize;
use tracing::info;

/// Route lifecycle events worth auditing independently of metrics counters.
#[derive(Debug, Serialize)]
pub enum RouteEvent {
    Created {
        instance_id: String,
        domain_external: String,
    },
    StateTransitioned {
        instance_id: String,
        to_state: RouteState,
    },
    CertificateDeployed {
        instance_id: String,
        domain: String,
    },
    RenewalSucceeded {
        instance_id: String,
    },
    RenewalFailed {
        instance_id: String,
        error: String,
    },
}

/// Audit logger for Route lifecycle events.
pub struct EventAuditor;

impl EventAuditor {
    /// Track a significant event
    pub fn track_event(event: RouteEvent) {
        let event_json = serde_json::to_string(&event).unwrap_or_default();
        info!(target: "routex_audit", event = %event_json, "route lifecycle event");
    }
}
