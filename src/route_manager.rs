//! The facade (§4.4): `create`, `get`, `update`, `disable`, `renew`, and
//! `renew_all`. Every per-instance operation is serialised through
//! [`KeyedLocks`] so at most one Reconciler/renewal invocation is in flight
//! per Route at a time (§5).

use crate::error::{Result, RouteError};
use crate::keyed_lock::KeyedLocks;
use crate::metrics::SharedMetrics;
use crate::metrics::events::{EventAuditor, RouteEvent};
use crate::reconciler::Reconciler;
use crate::renewal::RenewalService;
use crate::store::{RouteStore, StorageBackend};
use crate::types::Route;
use futures::stream::{self, StreamExt};
use jiff::Timestamp;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info};

/// Owns the Store, the Reconciler, and the renewal service behind a single
/// per-instance serialisation point.
pub struct RouteManager<B: StorageBackend> {
    store: RouteStore<B>,
    reconciler: Reconciler,
    renewal: RenewalService,
    locks: KeyedLocks,
    metrics: Option<SharedMetrics>,
    renewal_horizon: Duration,
    sweep_concurrency: usize,
}

impl<B: StorageBackend> RouteManager<B> {
    pub fn new(
        store: RouteStore<B>,
        reconciler: Reconciler,
        renewal: RenewalService,
        renewal_horizon: Duration,
        sweep_concurrency: usize,
    ) -> Self {
        Self {
            store,
            reconciler,
            renewal,
            locks: KeyedLocks::new(),
            metrics: None,
            renewal_horizon,
            sweep_concurrency,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Creates a new Route: provisions a CDN distribution and persists the
    /// Route in `Provisioning`. Duplicate `instance_id`s surface as
    /// `Conflict` from the Store.
    pub async fn create(
        &self,
        instance_id: impl Into<String>,
        domain_external: impl Into<String>,
        origin: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<Route> {
        let instance_id = instance_id.into();
        let domain_external = domain_external.into();
        let origin = origin.into();
        let path = path.into();

        let _guard = self.locks.lock(&instance_id).await;

        let domains: Vec<String> = domain_external
            .split(',')
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        let dist = self
            .reconciler
            .cdn()
            .create(&domains, &origin, &path, false, &[], &HashMap::new())
            .await?;

        let now = Timestamp::now();
        let mut route = Route::new(instance_id, domain_external.clone(), origin, path, now);
        route.dist_id = Some(dist.dist_id);
        route.domain_internal = Some(dist.domain_name);

        self.store.insert_route(&route).await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_transition(None, route.state);
        }
        EventAuditor::track_event(RouteEvent::Created {
            instance_id: route.instance_id.clone(),
            domain_external,
        });

        Ok(route)
    }

    /// Looks up a Route by `instance_id`.
    pub async fn get(&self, instance_id: &str) -> Result<Route> {
        self.store.get_route(instance_id).await
    }

    /// Advances a Route's reconciliation by at most one transition.
    pub async fn update(&self, instance_id: &str) -> Result<Route> {
        let _guard = self.locks.lock(instance_id).await;

        let mut route = self.store.get_route(instance_id).await?;
        let prior_state = route.state;

        self.reconciler.update(&mut route, Timestamp::now()).await?;
        self.store.save_route(&route).await?;

        if route.state != prior_state {
            if let Some(metrics) = &self.metrics {
                metrics.record_transition(Some(prior_state), route.state);
            }
            EventAuditor::track_event(RouteEvent::StateTransitioned {
                instance_id: route.instance_id.clone(),
                to_state: route.state,
            });
        }

        Ok(route)
    }

    /// Begins teardown: disables the distribution and moves the Route to
    /// `Deprovisioning`. Subsequent `update` calls drive it to
    /// `Deprovisioned` per §4.3.2. The only defined `Disable` transition is
    /// `Provisioned -> Deprovisioning` (§4.3); calling it from any other
    /// state would regress or re-run teardown on an already-torn-down
    /// distribution, so it is rejected rather than silently applied.
    pub async fn disable(&self, instance_id: &str) -> Result<Route> {
        let _guard = self.locks.lock(instance_id).await;

        let mut route = self.store.get_route(instance_id).await?;
        if route.state != crate::types::RouteState::Provisioned {
            return Err(RouteError::invalid_input(format!(
                "cannot disable route {instance_id} in state {}, expected {}",
                route.state,
                crate::types::RouteState::Provisioned
            )));
        }
        let prior_state = route.state;
        let dist_id = route
            .dist_id
            .clone()
            .ok_or_else(|| RouteError::fatal("route has no dist_id"))?;

        self.reconciler.cdn().disable(&dist_id).await?;

        route.state = crate::types::RouteState::Deprovisioning;
        route.updated_at = Timestamp::now();
        self.store.save_route(&route).await?;

        if let Some(metrics) = &self.metrics {
            metrics.record_transition(Some(prior_state), route.state);
        }

        Ok(route)
    }

    /// Renews a single Route's certificate immediately.
    pub async fn renew(&self, instance_id: &str) -> Result<Route> {
        let _guard = self.locks.lock(instance_id).await;

        let mut route = self.store.get_route(instance_id).await?;
        self.renewal.renew(&mut route, Timestamp::now()).await?;
        self.store.save_route(&route).await?;

        Ok(route)
    }

    /// Renews every Route due within the configured horizon, under bounded
    /// concurrency (§4.6, §5). Per-Route failures are logged and isolated;
    /// they never abort the sweep.
    pub async fn renew_all(&self) -> Result<()> {
        let due = self
            .store
            .list_due_for_renewal(self.renewal_horizon, Timestamp::now())
            .await?;

        info!(count = due.len(), "starting renewal sweep");

        let outcomes: Vec<(String, Result<()>)> = stream::iter(due)
            .map(|route| self.renew_one(route))
            .buffer_unordered(self.sweep_concurrency)
            .collect()
            .await;

        for (instance_id, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_renewal_success();
                    }
                    EventAuditor::track_event(RouteEvent::RenewalSucceeded { instance_id });
                }
                Err(e) => {
                    error!(instance_id, error = %e, "renewal failed during sweep");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_renewal_failure();
                    }
                    EventAuditor::track_event(RouteEvent::RenewalFailed {
                        instance_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    async fn renew_one(&self, mut route: Route) -> (String, Result<()>) {
        let instance_id = route.instance_id.clone();
        let _guard = self.locks.lock(&instance_id).await;
        let outcome = async {
            self.renewal.renew(&mut route, Timestamp::now()).await?;
            self.store.save_route(&route).await
        }
        .await;
        (instance_id, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::X509PemParser;
    use crate::collaborators::fakes::{CallLog, FakeAcme, FakeCdn, FakeIam};
    use crate::dns_probe::DnsProbe;
    use crate::store::MemoryStorage;
    use std::sync::Arc;

    fn manager() -> (RouteManager<MemoryStorage>, CallLog) {
        let log = CallLog::new();
        let cdn: Arc<dyn crate::collaborators::DistributionIface> = Arc::new(FakeCdn::new(log.clone()));
        let iam: Arc<dyn crate::collaborators::IamIface> = Arc::new(FakeIam::new(log.clone()));
        let acme: Arc<dyn crate::collaborators::AcmeIface> = Arc::new(FakeAcme::new(log.clone()));
        let pem_parser: Arc<dyn crate::collaborators::PemParser> = Arc::new(X509PemParser);
        let dns = Arc::new(DnsProbe::new(Duration::from_millis(50)));

        let reconciler = Reconciler::new(cdn.clone(), iam.clone(), acme.clone(), pem_parser.clone(), dns);
        let renewal = RenewalService::new(cdn, iam, acme, pem_parser);
        let store = RouteStore::new(MemoryStorage::new());
        (RouteManager::new(store, reconciler, renewal, Duration::from_secs(30 * 24 * 3600), 4), log)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (manager, _log) = manager();
        let created = manager.create("inst-1", "a.example.com", "origin.app", "/").await.unwrap();
        assert_eq!(created.state, crate::types::RouteState::Provisioning);
        assert!(created.dist_id.is_some());

        let fetched = manager.get("inst-1").await.unwrap();
        assert_eq!(fetched.instance_id, "inst-1");
    }

    #[tokio::test]
    async fn create_duplicate_instance_id_conflicts() {
        let (manager, _log) = manager();
        manager.create("inst-1", "a.example.com", "origin.app", "/").await.unwrap();
        let err = manager
            .create("inst-1", "b.example.com", "origin.app", "/")
            .await
            .unwrap_err();
        assert!(matches!(err, RouteError::Conflict(_)));
    }

    #[tokio::test]
    async fn get_unknown_instance_is_not_found() {
        let (manager, _log) = manager();
        let err = manager.get("missing").await.unwrap_err();
        assert!(matches!(err, RouteError::NotFound(_)));
    }

    #[tokio::test]
    async fn disable_rejects_a_route_that_is_not_provisioned() {
        let (manager, _log) = manager();
        manager.create("inst-1", "a.example.com", "origin.app", "/").await.unwrap();

        // Still Provisioning, not Provisioned: disable must refuse rather
        // than regress straight to Deprovisioning.
        let err = manager.disable("inst-1").await.unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput(_)));

        let route = manager.get("inst-1").await.unwrap();
        assert_eq!(route.state, crate::types::RouteState::Provisioning);
    }

    #[tokio::test]
    async fn disable_rejects_a_route_already_deprovisioned() {
        let (manager, _log) = manager();
        let mut route = manager.create("inst-1", "a.example.com", "origin.app", "/").await.unwrap();
        route.state = crate::types::RouteState::Deprovisioned;
        manager.store.save_route(&route).await.unwrap();

        let err = manager.disable("inst-1").await.unwrap_err();
        assert!(matches!(err, RouteError::InvalidInput(_)));
    }
}
