//! Provisioning → Provisioned (§4.3.1).

use super::deploy::deploy_certificate;
use crate::collaborators::{AcmeIface, DistributionIface, IamIface, PemParser};
use crate::dns_probe::DnsProbe;
use crate::error::{Result, RouteError};
use crate::types::{Certificate, Route, RouteState};
use jiff::Timestamp;
use tracing::info;

/// Attempts the Provisioning → Provisioned transition in place. A gate
/// failure is a silent no-op (I3, I4): the caller is expected to call again
/// once DNS and distribution propagation have caught up.
pub async fn provision(
    cdn: &dyn DistributionIface,
    iam: &dyn IamIface,
    acme: &dyn AcmeIface,
    pem_parser: &dyn PemParser,
    dns: &DnsProbe,
    route: &mut Route,
    now: Timestamp,
) -> Result<()> {
    let dns_ready = dns.cname_check(route).await || dns.host_check(route).await;
    if !dns_ready {
        return Ok(());
    }

    let Some(dist_id) = route.dist_id.clone() else {
        return Err(RouteError::fatal("Provisioning route has no dist_id"));
    };

    let dist = cdn.get(&dist_id).await?;
    let distribution_ready = dist.status == "Deployed" && dist.enabled;
    if !distribution_ready {
        return Ok(());
    }

    let domains = route.domains();
    let resource = acme.obtain_certificate(&domains).await?;

    deploy_certificate(cdn, iam, route, &dist_id, &resource.certificate_pem).await?;

    let expires = pem_parser.expiration_of(resource.certificate_pem.as_bytes())?;

    route.certificate = Some(Certificate {
        route_id: route.instance_id.clone(),
        domain: resource.domain,
        cert_url: resource.cert_url,
        certificate: resource.certificate_pem,
        expires,
    });
    route.state = RouteState::Provisioned;
    route.updated_at = now;

    info!(instance_id = %route.instance_id, %expires, "route provisioned");
    Ok(())
}
