/// Common types and structures for the route manager's data model
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Route`]. Transitions are forward-only; see the
/// reconciler module for the state machine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteState {
    Provisioning,
    Provisioned,
    Deprovisioning,
    Deprovisioned,
}

impl RouteState {
    /// `update` is a no-op in the terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(self, RouteState::Provisioned | RouteState::Deprovisioned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteState::Provisioning => "provisioning",
            RouteState::Provisioned => "provisioned",
            RouteState::Deprovisioning => "deprovisioning",
            RouteState::Deprovisioned => "deprovisioned",
        }
    }
}

impl std::fmt::Display for RouteState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One service instance: a tenant-facing domain fronted by a CDN
/// distribution and (once provisioned) a TLS certificate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    /// Unique opaque tenant-supplied handle.
    pub instance_id: String,
    pub state: RouteState,
    /// Comma-joined tenant-facing hostnames (SAN list on the cert).
    pub domain_external: String,
    /// Distribution hostname assigned by the CDN, once created.
    pub domain_internal: Option<String>,
    /// CDN-assigned distribution identifier, once created.
    pub dist_id: Option<String>,
    pub origin: String,
    pub path: String,
    /// The Route's current certificate, if one has been installed.
    pub certificate: Option<Certificate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl Route {
    /// A freshly created Route, in `Provisioning`, with no distribution or
    /// certificate assigned yet.
    pub fn new(
        instance_id: impl Into<String>,
        domain_external: impl Into<String>,
        origin: impl Into<String>,
        path: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            state: RouteState::Provisioning,
            domain_external: domain_external.into(),
            domain_internal: None,
            dist_id: None,
            origin: origin.into(),
            path: path.into(),
            certificate: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// The comma-split SAN list covered by this Route's certificate.
    pub fn domains(&self) -> Vec<String> {
        self.domain_external
            .split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// The IAM alias under which this Route's certificate is kept once
    /// promoted out of staging (see the certificate deployment protocol).
    pub fn iam_alias(&self) -> String {
        format!("cdn-route-{}", self.domain_external)
    }

    /// The staging IAM alias used while a new certificate is being bound.
    pub fn iam_staging_alias(&self) -> String {
        format!("cdn-route-{}-new", self.domain_external)
    }
}

/// The current certificate for a Route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    /// Back-reference to the owning Route.
    pub route_id: String,
    /// Common name reported by the CA.
    pub domain: String,
    /// CA-assigned resource URL, required to renew via ACME.
    pub cert_url: String,
    /// PEM-encoded certificate chain.
    pub certificate: String,
    /// Not-after time, parsed from `certificate`.
    pub expires: Timestamp,
}
