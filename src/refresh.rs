//! Periodic background refresh of every cache key.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::SnapshotCache;

pub struct CacheRefresher {
    cache: Arc<SnapshotCache>,
    interval_secs: u64,
}

impl CacheRefresher {
    pub fn new(cache: Arc<SnapshotCache>, interval_secs: u64) -> Self {
        Self { cache, interval_secs }
    }

    /// Runs forever. Per-source failures are logged inside `refresh_all`
    /// and never stop the loop.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick fires immediately; the caller already did the
        // bootstrap refresh, so skip it.
        interval.tick().await;

        info!(interval_secs = self.interval_secs, "cache refresher started");
        loop {
            interval.tick().await;
            debug!("scheduled refresh starting");
            self.cache.refresh_all().await;
        }
    }
}
