//! Deprovisioning → Deprovisioned (§4.3.2).

use crate::collaborators::{DistributionIface, IamIface};
use crate::error::{Result, RouteError};
use crate::types::{Route, RouteState};
use jiff::Timestamp;
use tracing::info;

/// Attempts the Deprovisioning → Deprovisioned transition in place. A
/// distribution that hasn't finished propagating its disable yet reports
/// `deleted = false`; that's a no-op, not an error — retry on the next tick.
pub async fn deprovision(
    cdn: &dyn DistributionIface,
    iam: &dyn IamIface,
    route: &mut Route,
    now: Timestamp,
) -> Result<()> {
    let Some(dist_id) = route.dist_id.clone() else {
        return Err(RouteError::fatal("Deprovisioning route has no dist_id"));
    };

    let deleted = cdn.delete(&dist_id).await?;
    if !deleted {
        return Ok(());
    }

    iam.delete_certificate(&route.iam_alias(), true).await?;

    route.state = RouteState::Deprovisioned;
    route.deleted_at = Some(now);
    route.updated_at = now;

    info!(instance_id = %route.instance_id, "route deprovisioned");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{CallLog, FakeCdn, FakeIam};
    use std::collections::HashMap;

    fn now() -> Timestamp {
        Timestamp::from_second(1_700_000_000).unwrap()
    }

    #[tokio::test]
    async fn waits_for_deletion_before_advancing() {
        let log = CallLog::new();
        let cdn = FakeCdn::new(log.clone());
        let iam = FakeIam::new(log);
        let dist = cdn
            .create(&["a.example.com".into()], "origin.app", "/", false, &[], &HashMap::new())
            .await
            .unwrap();
        cdn.script_delete(&dist.dist_id, [false, true]).await;

        let mut route = Route::new("inst-1", "a.example.com", "origin.app", "/", now());
        route.dist_id = Some(dist.dist_id.clone());
        route.state = RouteState::Deprovisioning;

        deprovision(&cdn, &iam, &mut route, now()).await.unwrap();
        assert_eq!(route.state, RouteState::Deprovisioning);

        deprovision(&cdn, &iam, &mut route, now()).await.unwrap();
        assert_eq!(route.state, RouteState::Deprovisioned);
        assert!(route.deleted_at.is_some());
    }
}
