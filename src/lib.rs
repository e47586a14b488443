//! # RouteX - CDN/ACME certificate broker reconciliation engine
//!
//! A reconciliation engine for CDN edge distributions fronted by
//! automatically issued ACME TLS certificates: a Route Manager facade drives
//! each Route (a tenant-facing domain) through a small state machine —
//! Provisioning, Provisioned, Deprovisioning, Deprovisioned — by consulting
//! a DNS readiness probe and a CDN control plane, then commanding an ACME
//! client and an IAM certificate store through the deployment protocol that
//! keeps bind operations crash-safe and idempotent.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routex::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn doc(
//! #     cdn: Arc<dyn DistributionIface>,
//! #     iam: Arc<dyn IamIface>,
//! #     acme: Arc<dyn AcmeIface>,
//! # ) -> routex::error::Result<()> {
//! let pem_parser = Arc::new(X509PemParser);
//! let dns = Arc::new(DnsProbe::new(Duration::from_secs(2)));
//! let reconciler = Reconciler::new(cdn.clone(), iam.clone(), acme.clone(), pem_parser.clone(), dns);
//! let renewal = RenewalService::new(cdn, iam, acme, pem_parser);
//! let store = RouteStore::new(MemoryStorage::new());
//! let manager = RouteManager::new(store, reconciler, renewal, Duration::from_secs(30 * 24 * 3600), 8);
//!
//! let route = manager.create("inst-1", "app.tenant.example", "origin.tenant.example", "/").await?;
//! manager.update(&route.instance_id).await?;
//! # Ok(())
//! # }
//! ```

pub mod collaborators;
pub mod config;
pub mod dns_probe;
pub mod error;
mod keyed_lock;
pub mod metrics;
pub mod reconciler;
pub mod renewal;
pub mod route_manager;
pub mod scheduler;
pub mod store;
pub mod types;

pub use collaborators::{
    AcmeIface, CertResource, Distribution, DistributionIface, IamIface, PemParser, X509PemParser,
};
pub use config::Config;
pub use dns_probe::DnsProbe;
pub use error::{Result, RouteError};
pub use metrics::{HealthStatus, MetricsRegistry, SharedMetrics};
pub use reconciler::Reconciler;
pub use renewal::{RenewalHook, RenewalService};
pub use route_manager::RouteManager;
pub use scheduler::RenewalSweeper;
pub use store::{FileStorage, MemoryStorage, RouteStore, StorageBackend};
#[cfg(feature = "redis")]
pub use store::RedisStorage;
pub use types::{Certificate, Route, RouteState};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::{
        AcmeIface, CertResource, Config, Distribution, DistributionIface, DnsProbe, IamIface,
        MemoryStorage, PemParser, Reconciler, RenewalHook, RenewalService, RenewalSweeper, Route,
        RouteError, RouteManager, RouteState, RouteStore, StorageBackend, X509PemParser,
    };
}
