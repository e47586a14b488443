//! The state machine (§4.3) that drives a Route forward one step at a time.
//! `update` is the only entry point; it dispatches on current state and is a
//! no-op in the terminal ones, the same "thin dispatcher over one file per
//! transition" shape this lineage uses for its own orchestration layer.

mod deploy;
mod deprovision;
mod provision;

use crate::collaborators::{AcmeIface, DistributionIface, IamIface, PemParser};
use crate::dns_probe::DnsProbe;
use crate::error::Result;
use crate::types::{Route, RouteState};
use jiff::Timestamp;
use std::sync::Arc;

pub use deploy::deploy_certificate;

/// Owns the collaborator handles and dispatches `update` by Route state.
/// Cheaply cloneable: every field is an `Arc`.
#[derive(Clone)]
pub struct Reconciler {
    cdn: Arc<dyn DistributionIface>,
    iam: Arc<dyn IamIface>,
    acme: Arc<dyn AcmeIface>,
    pem_parser: Arc<dyn PemParser>,
    dns: Arc<DnsProbe>,
}

impl Reconciler {
    pub fn new(
        cdn: Arc<dyn DistributionIface>,
        iam: Arc<dyn IamIface>,
        acme: Arc<dyn AcmeIface>,
        pem_parser: Arc<dyn PemParser>,
        dns: Arc<DnsProbe>,
    ) -> Self {
        Self {
            cdn,
            iam,
            acme,
            pem_parser,
            dns,
        }
    }

    /// Advances `route` by at most one state transition, or leaves it
    /// untouched if its gate hasn't passed yet or its state is terminal.
    pub async fn update(&self, route: &mut Route, now: Timestamp) -> Result<()> {
        match route.state {
            RouteState::Provisioning => {
                provision::provision(
                    self.cdn.as_ref(),
                    self.iam.as_ref(),
                    self.acme.as_ref(),
                    self.pem_parser.as_ref(),
                    self.dns.as_ref(),
                    route,
                    now,
                )
                .await
            }
            RouteState::Deprovisioning => {
                deprovision::deprovision(self.cdn.as_ref(), self.iam.as_ref(), route, now).await
            }
            RouteState::Provisioned | RouteState::Deprovisioned => Ok(()),
        }
    }

    pub fn cdn(&self) -> &dyn DistributionIface {
        self.cdn.as_ref()
    }

    pub fn iam(&self) -> &dyn IamIface {
        self.iam.as_ref()
    }

    pub fn acme(&self) -> &dyn AcmeIface {
        self.acme.as_ref()
    }

    pub fn pem_parser(&self) -> &dyn PemParser {
        self.pem_parser.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::X509PemParser;
    use crate::collaborators::fakes::{CallLog, FakeAcme, FakeCdn, FakeIam};
    use std::time::Duration;

    fn now() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    #[tokio::test]
    async fn update_on_terminal_state_is_noop() {
        let log = CallLog::new();
        let reconciler = Reconciler::new(
            Arc::new(FakeCdn::new(log.clone())),
            Arc::new(FakeIam::new(log.clone())),
            Arc::new(FakeAcme::new(log.clone())),
            Arc::new(X509PemParser),
            Arc::new(DnsProbe::new(Duration::from_millis(50))),
        );
        let mut route = Route::new("inst-1", "a.example.com", "origin.app", "/", now());
        route.state = RouteState::Provisioned;

        reconciler.update(&mut route, now()).await.unwrap();
        assert!(log.entries().await.is_empty());
    }
}
