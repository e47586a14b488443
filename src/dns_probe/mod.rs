//! Read-side DNS readiness checks (§4.2): does a Route's external domain
//! already point at its CDN distribution? Built on the same async resolver
//! this lineage uses for its own challenge validation, but deliberately
//! uncached — every tick must see the current state of the world.

use crate::types::Route;
use hickory_resolver::TokioResolver;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Wraps a `hickory-resolver` client with the two predicates the Reconciler
/// gates on. Any resolver error or timeout is treated as "not ready" rather
/// than propagated, per §4.2.
pub struct DnsProbe {
    resolver: TokioResolver,
    lookup_timeout: Duration,
}

impl DnsProbe {
    pub fn new(lookup_timeout: Duration) -> Self {
        let resolver = TokioResolver::builder_with_config(
            ResolverConfig::new(),
            TokioConnectionProvider::default(),
        )
        .build();
        Self {
            resolver,
            lookup_timeout,
        }
    }

    /// Passes only if every external domain's CNAME equals
    /// `<domain_internal>.` (case-insensitive, trailing dot significant).
    pub async fn cname_check(&self, route: &Route) -> bool {
        let Some(domain_internal) = route.domain_internal.as_deref() else {
            return false;
        };
        let expected = format!("{}.", domain_internal.trim_end_matches('.')).to_ascii_lowercase();

        for domain in route.domains() {
            match self.lookup_cname(&domain).await {
                Some(cname) if cname.to_ascii_lowercase() == expected => continue,
                _ => return false,
            }
        }
        true
    }

    /// Passes only if every external domain's A/AAAA set equals
    /// `domain_internal`'s A/AAAA set, compared as a sorted sequence.
    pub async fn host_check(&self, route: &Route) -> bool {
        let Some(domain_internal) = route.domain_internal.as_deref() else {
            return false;
        };
        let Some(mut target_ips) = self.lookup_ips(domain_internal).await else {
            return false;
        };
        target_ips.sort();

        for domain in route.domains() {
            let Some(mut ips) = self.lookup_ips(&domain).await else {
                return false;
            };
            ips.sort();
            if ips != target_ips {
                return false;
            }
        }
        true
    }

    async fn lookup_cname(&self, domain: &str) -> Option<String> {
        let lookup = match timeout(self.lookup_timeout, self.resolver.lookup(domain, hickory_resolver::proto::rr::RecordType::CNAME)).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => {
                warn!(domain, error = %e, "CNAME lookup failed, treating as not ready");
                return None;
            }
            Err(_) => {
                warn!(domain, "CNAME lookup timed out, treating as not ready");
                return None;
            }
        };
        lookup
            .iter()
            .find_map(|record| record.as_cname().map(|name| name.to_string()))
    }

    async fn lookup_ips(&self, domain: &str) -> Option<Vec<IpAddr>> {
        match timeout(self.lookup_timeout, self.resolver.lookup_ip(domain)).await {
            Ok(Ok(response)) => Some(response.iter().collect()),
            Ok(Err(e)) => {
                warn!(domain, error = %e, "A/AAAA lookup failed, treating as not ready");
                None
            }
            Err(_) => {
                warn!(domain, "A/AAAA lookup timed out, treating as not ready");
                None
            }
        }
    }
}
