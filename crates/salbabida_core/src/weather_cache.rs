//! crates/salbabida_core/src/weather_cache.rs
//!
//! Keyed store of the last fetched weather snapshot per location. The cache
//! knows nothing about the network; the read-through policy lives in
//! [`crate::weather::WeatherLookup`].

use std::sync::Arc;

use tracing::info;

use crate::domain::WeatherSnapshot;
use crate::ports::{Clock, PortResult, WeatherDatabase};

pub struct WeatherCache {
    db: Arc<dyn WeatherDatabase>,
    clock: Arc<dyn Clock>,
}

impl WeatherCache {
    pub fn new(db: Arc<dyn WeatherDatabase>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// The stored snapshot for `location_key`, fresh or not. Never fetches.
    pub async fn get(&self, location_key: &str) -> PortResult<Option<WeatherSnapshot>> {
        self.db.get_snapshot(location_key).await
    }

    /// Replaces whatever was stored under the snapshot's key.
    pub async fn put(&self, snapshot: &WeatherSnapshot) -> PortResult<()> {
        self.db.upsert_snapshot(snapshot).await
    }

    pub fn is_stale(&self, snapshot: &WeatherSnapshot) -> bool {
        snapshot.is_stale_at(self.clock.now())
    }

    pub async fn clear_all(&self) -> PortResult<u64> {
        let removed = self.db.clear_snapshots().await?;
        info!("Cleared {} cached weather snapshots", removed);
        Ok(removed)
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
