//! Single-Route renewal (§4.4's `renew` op): ACME-renew from the stored
//! Certificate's resource reference, redeploy via the same protocol used by
//! provisioning, and rewrite the Certificate row in place.

use crate::collaborators::{AcmeIface, CertResource, DistributionIface, IamIface, PemParser};
use crate::error::{Result, RouteError};
use crate::reconciler::deploy_certificate;
use crate::types::{Certificate, Route};
use jiff::Timestamp;
use std::sync::Arc;

/// Observes a single Route's renewal lifecycle. All methods default to
/// no-ops so callers only implement what they care about, the way this
/// lineage's own renewal hook works.
pub trait RenewalHook: Send + Sync {
    fn before_renewal(&self, _route: &Route) {}
    fn after_renewal(&self, _route: &Route, _certificate: &Certificate) {}
    fn on_error(&self, _route: &Route, _error: &RouteError) {}
}

/// Renews one Route's certificate through ACME and the deployment protocol.
#[derive(Clone)]
pub struct RenewalService {
    cdn: Arc<dyn DistributionIface>,
    iam: Arc<dyn IamIface>,
    acme: Arc<dyn AcmeIface>,
    pem_parser: Arc<dyn PemParser>,
    hook: Option<Arc<dyn RenewalHook>>,
}

impl RenewalService {
    pub fn new(
        cdn: Arc<dyn DistributionIface>,
        iam: Arc<dyn IamIface>,
        acme: Arc<dyn AcmeIface>,
        pem_parser: Arc<dyn PemParser>,
    ) -> Self {
        Self {
            cdn,
            iam,
            acme,
            pem_parser,
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn RenewalHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Renews `route`'s certificate in place. On failure the prior
    /// Certificate row is left untouched, per §4.4.
    pub async fn renew(&self, route: &mut Route, now: Timestamp) -> Result<()> {
        if let Some(hook) = &self.hook {
            hook.before_renewal(route);
        }

        match self.renew_inner(route, now).await {
            Ok(()) => {
                if let Some(hook) = &self.hook {
                    hook.after_renewal(route, route.certificate.as_ref().expect("set by renew_inner"));
                }
                Ok(())
            }
            Err(e) => {
                if let Some(hook) = &self.hook {
                    hook.on_error(route, &e);
                }
                Err(e)
            }
        }
    }

    async fn renew_inner(&self, route: &mut Route, now: Timestamp) -> Result<()> {
        let dist_id = route
            .dist_id
            .clone()
            .ok_or_else(|| RouteError::fatal("route has no dist_id"))?;
        let current = route
            .certificate
            .clone()
            .ok_or_else(|| RouteError::fatal("route has no certificate to renew"))?;

        let resource = CertResource {
            domain: current.domain,
            cert_url: current.cert_url,
            certificate_pem: current.certificate,
        };

        let renewed = self.acme.renew_certificate(&resource).await?;

        deploy_certificate(
            self.cdn.as_ref(),
            self.iam.as_ref(),
            route,
            &dist_id,
            &renewed.certificate_pem,
        )
        .await?;

        let expires = self.pem_parser.expiration_of(renewed.certificate_pem.as_bytes())?;

        route.certificate = Some(Certificate {
            route_id: route.instance_id.clone(),
            domain: renewed.domain,
            cert_url: renewed.cert_url,
            certificate: renewed.certificate_pem,
            expires,
        });
        route.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{CallLog, FakeAcme, FakeCdn, FakeIam, FakePemParser};
    use crate::types::RouteState;
    use std::collections::HashMap;

    fn now() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    async fn provisioned_route(cdn: &FakeCdn, acme: &FakeAcme) -> Route {
        let dist = cdn
            .create(&["a.example.com".into()], "origin.app", "/", false, &[], &HashMap::new())
            .await
            .unwrap();
        let resource = crate::collaborators::AcmeIface::obtain_certificate(acme, &["a.example.com".into()])
            .await
            .unwrap();
        let mut route = Route::new("inst-1", "a.example.com", "origin.app", "/", now());
        route.dist_id = Some(dist.dist_id);
        route.domain_internal = Some(dist.domain_name);
        route.state = RouteState::Provisioned;
        route.certificate = Some(Certificate {
            route_id: route.instance_id.clone(),
            domain: resource.domain,
            cert_url: resource.cert_url,
            certificate: resource.certificate_pem,
            expires: now(),
        });
        route
    }

    #[tokio::test]
    async fn renew_rewrites_expiry_and_preserves_order() {
        let log = CallLog::new();
        let cdn = FakeCdn::new(log.clone());
        let iam = FakeIam::new(log.clone());
        let acme = FakeAcme::new(log.clone());
        let mut route = provisioned_route(&cdn, &acme).await;
        let service = RenewalService::new(
            Arc::new(cdn),
            Arc::new(iam),
            Arc::new(acme),
            Arc::new(FakePemParser),
        );

        service.renew(&mut route, now()).await.unwrap();

        let cert = route.certificate.unwrap();
        assert!(cert.expires > now());

        let entries = log.entries().await;
        let upload = entries.iter().position(|e| e.starts_with("iam.upload")).unwrap();
        let bind = entries.iter().position(|e| e.starts_with("cdn.set_certificate")).unwrap();
        let rename = entries.iter().position(|e| e.starts_with("iam.rename")).unwrap();
        assert!(upload < bind && bind < rename, "deploy order must be upload, bind, rename");
    }

    #[tokio::test]
    async fn failed_renew_leaves_prior_certificate_untouched() {
        let log = CallLog::new();
        let cdn = FakeCdn::new(log.clone());
        let iam = FakeIam::new(log.clone());
        let acme = FakeAcme::new(log.clone());
        let mut route = provisioned_route(&cdn, &acme).await;
        let original = route.certificate.clone().unwrap();
        acme.fail_for("a.example.com").await;
        let service = RenewalService::new(
            Arc::new(cdn),
            Arc::new(iam),
            Arc::new(acme),
            Arc::new(FakePemParser),
        );

        let err = service.renew(&mut route, now()).await;
        assert!(err.is_err());
        assert_eq!(route.certificate.unwrap().cert_url, original.cert_url);
    }
}
