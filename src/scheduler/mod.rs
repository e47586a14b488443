//! The periodic driver (§4.6, §5): a thin ticker around `renew_all`, the
//! same separation this lineage draws between its cleanup scheduler (just a
//! `tokio::time::interval` loop) and the scan-and-act routine it drives.
//! The bounded-concurrency fan-out itself lives on `RouteManager::renew_all`
//! — this module contributes nothing but the schedule.

use crate::route_manager::RouteManager;
use crate::store::StorageBackend;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Calls [`RouteManager::renew_all`] on a fixed interval, forever.
pub struct RenewalSweeper<B: StorageBackend + 'static> {
    manager: Arc<RouteManager<B>>,
    interval: Duration,
}

impl<B: StorageBackend + 'static> RenewalSweeper<B> {
    pub fn new(manager: Arc<RouteManager<B>>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Runs the sweep loop forever. Intended to be spawned as its own task
    /// by the embedding binary.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.manager.renew_all().await {
                error!(error = %e, "renewal sweep failed");
            }
        }
    }
}
