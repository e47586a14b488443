//! The certificate deployment protocol (§4.5): the only place a certificate
//! is bound to a distribution, shared by both provisioning and renewal so
//! the ordering invariant (I7) holds in exactly one spot.

use crate::collaborators::{DistributionIface, IamIface};
use crate::error::Result;
use crate::types::Route;
use tracing::info;

/// Uploads `cert_pem` to `route`'s staging alias, binds it to `dist_id`, then
/// promotes the staging alias to the canonical one. Tolerant of a rename
/// whose staging side was already consumed by a previous, interrupted
/// attempt — callers can retry this whole sequence freely.
pub async fn deploy_certificate(
    cdn: &dyn DistributionIface,
    iam: &dyn IamIface,
    route: &Route,
    dist_id: &str,
    cert_pem: &str,
) -> Result<String> {
    let staging_alias = route.iam_staging_alias();
    let canonical_alias = route.iam_alias();
    let domain = route.domain_external.as_str();

    let cert_id = iam.upload_certificate(&staging_alias, cert_pem).await?;
    info!(domain, %cert_id, "uploaded certificate to staging alias");

    cdn.set_certificate(dist_id, &cert_id).await?;
    info!(domain, dist_id, %cert_id, "bound certificate to distribution");

    iam.rename_certificate(&staging_alias, &canonical_alias).await?;
    info!(domain, "promoted staging certificate to canonical alias");

    Ok(cert_id)
}
