//! The typed domain layer over [`StorageBackend`] (§4.1): Routes and their
//! Certificates, serialised under `route:`/`cert:` key prefixes. The
//! "enumerate Routes due for renewal" query is expressed the way this
//! lineage's own cleanup/renewal scans are — list a prefix, filter in
//! application code — rather than requiring a backend with real indices.

use crate::error::{Result, RouteError};
use crate::store::StorageBackend;
use crate::types::{Certificate, Route, RouteState};
use jiff::{Span, Timestamp};
use std::time::Duration;
use tracing::warn;

const ROUTE_PREFIX: &str = "route:";
const CERT_PREFIX: &str = "cert:";

/// A Route + Certificate store built on any [`StorageBackend`].
#[derive(Clone)]
pub struct RouteStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> RouteStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn route_key(instance_id: &str) -> String {
        format!("{ROUTE_PREFIX}{instance_id}")
    }

    fn cert_key(instance_id: &str) -> String {
        format!("{CERT_PREFIX}{instance_id}")
    }

    /// Looks up a Route by `instance_id`.
    pub async fn get_route(&self, instance_id: &str) -> Result<Route> {
        let data = self
            .backend
            .load(&Self::route_key(instance_id))
            .await?
            .ok_or_else(|| RouteError::not_found(instance_id))?;
        serde_json::from_slice(&data).map_err(|e| RouteError::storage(format!("deserialize route failed: {e}")))
    }

    /// Inserts a brand-new Route, surfacing `Conflict` if `instance_id` is
    /// already taken.
    pub async fn insert_route(&self, route: &Route) -> Result<()> {
        if self.get_route(&route.instance_id).await.is_ok() {
            return Err(RouteError::conflict(format!(
                "instance_id already exists: {}",
                route.instance_id
            )));
        }
        self.save_route(route).await
    }

    /// Overwrites a Route's stored record (and its Certificate side-index,
    /// kept in sync so the renewal scan never has to deserialize every
    /// Route to find the ones that matter).
    pub async fn save_route(&self, route: &Route) -> Result<()> {
        let data = serde_json::to_vec(route)
            .map_err(|e| RouteError::storage(format!("serialize route failed: {e}")))?;
        self.backend.store(&Self::route_key(&route.instance_id), &data).await?;

        match &route.certificate {
            Some(cert) => {
                let cert_data = serde_json::to_vec(cert)
                    .map_err(|e| RouteError::storage(format!("serialize certificate failed: {e}")))?;
                self.backend
                    .store(&Self::cert_key(&route.instance_id), &cert_data)
                    .await?;
            }
            None => {
                self.backend.delete(&Self::cert_key(&route.instance_id)).await?;
            }
        }
        Ok(())
    }

    /// Enumerates Routes with `state = Provisioned AND certificate.expires <
    /// now + horizon`, eagerly attached, the way §4.1 describes. A missing
    /// or malformed Certificate/Route row is logged and skipped rather than
    /// failing the whole scan (§4.6).
    pub async fn list_due_for_renewal(&self, horizon: Duration, now: Timestamp) -> Result<Vec<Route>> {
        let threshold = now
            .checked_add(Span::new().seconds(horizon.as_secs() as i64))
            .map_err(|e| RouteError::fatal(format!("invalid renewal horizon: {e}")))?;

        let cert_keys = self.backend.list(CERT_PREFIX).await?;
        let mut due = Vec::new();

        for key in cert_keys {
            let Some(data) = self.backend.load(&key).await? else {
                continue;
            };
            let cert: Certificate = match serde_json::from_slice(&data) {
                Ok(cert) => cert,
                Err(e) => {
                    warn!(key, error = %e, "skipping malformed certificate row in renewal scan");
                    continue;
                }
            };
            if cert.expires >= threshold {
                continue;
            }

            let instance_id = key.strip_prefix(CERT_PREFIX).unwrap_or(&key);
            match self.get_route(instance_id).await {
                Ok(route) if route.state == RouteState::Provisioned => due.push(route),
                Ok(_) => {}
                Err(e) => {
                    warn!(instance_id, error = %e, "skipping route with no matching record in renewal scan");
                }
            }
        }

        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;

    fn now() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    fn route_with_cert(instance_id: &str, expires: Timestamp) -> Route {
        let mut route = Route::new(instance_id, "a.example.com", "origin.app", "/", now());
        route.state = RouteState::Provisioned;
        route.certificate = Some(Certificate {
            route_id: instance_id.to_string(),
            domain: "a.example.com".to_string(),
            cert_url: "https://ca.test/cert/1".to_string(),
            certificate: "pem".to_string(),
            expires,
        });
        route
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let store = RouteStore::new(MemoryStorage::new());
        let route = Route::new("inst-1", "a.example.com", "origin.app", "/", now());
        store.insert_route(&route).await.unwrap();
        let fetched = store.get_route("inst-1").await.unwrap();
        assert_eq!(fetched.instance_id, "inst-1");
    }

    #[tokio::test]
    async fn insert_duplicate_is_conflict() {
        let store = RouteStore::new(MemoryStorage::new());
        let route = Route::new("inst-1", "a.example.com", "origin.app", "/", now());
        store.insert_route(&route).await.unwrap();
        let err = store.insert_route(&route).await.unwrap_err();
        assert!(matches!(err, RouteError::Conflict(_)));
    }

    #[tokio::test]
    async fn get_missing_route_is_not_found() {
        let store = RouteStore::new(MemoryStorage::new());
        let err = store.get_route("missing").await.unwrap_err();
        assert!(matches!(err, RouteError::NotFound(_)));
    }

    #[tokio::test]
    async fn renewal_scan_excludes_exact_boundary() {
        let store = RouteStore::new(MemoryStorage::new());
        let horizon = Duration::from_secs(30 * 24 * 3600);
        let boundary = now().checked_add(Span::new().seconds(horizon.as_secs() as i64)).unwrap();

        let exactly_at_boundary = route_with_cert("inst-boundary", boundary);
        let inside_window = route_with_cert("inst-due", boundary.checked_sub(Span::new().seconds(1)).unwrap());
        store.save_route(&exactly_at_boundary).await.unwrap();
        store.save_route(&inside_window).await.unwrap();

        let due = store.list_due_for_renewal(horizon, now()).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].instance_id, "inst-due");
    }

    #[tokio::test]
    async fn renewal_scan_skips_non_provisioned_routes() {
        let store = RouteStore::new(MemoryStorage::new());
        let mut route = route_with_cert("inst-1", now());
        route.state = RouteState::Deprovisioning;
        store.save_route(&route).await.unwrap();

        let due = store
            .list_due_for_renewal(Duration::from_secs(30 * 24 * 3600), now())
            .await
            .unwrap();
        assert!(due.is_empty());
    }
}
