//! crates/salbabida_core/src/sync.rs
//!
//! Mirrors local markers to the remote collection and exposes the shared
//! evacuation-centre list. Every network call here is triggered by a caller;
//! nothing retries in the background.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::domain::{
    Facility, MarkerCategory, NearestFacility, RemoteShelter, SyncReport, SyncStatus, UserRole,
};
use crate::geo;
use crate::markers::MarkerStore;
use crate::ports::{PortError, PortResult, RemoteStoreService};

pub struct SyncCoordinator {
    markers: Arc<MarkerStore>,
    remote: Arc<dyn RemoteStoreService>,
    /// Last shelter list fetched in this session; `None` until a fetch succeeds.
    shelters: RwLock<Option<Vec<RemoteShelter>>>,
}

impl SyncCoordinator {
    pub fn new(markers: Arc<MarkerStore>, remote: Arc<dyn RemoteStoreService>) -> Self {
        Self {
            markers,
            remote,
            shelters: RwLock::new(None),
        }
    }

    /// Pushes every PENDING or FAILED marker once. A marker that fails stays
    /// eligible for the next call, and so does one edited while its push was
    /// in flight.
    pub async fn sync_pending(&self) -> PortResult<SyncReport> {
        let mut queue = self.markers.list_by_sync(SyncStatus::Pending).await?;
        queue.extend(self.markers.list_by_sync(SyncStatus::Failed).await?);

        let mut report = SyncReport::default();
        for marker in queue {
            match self.remote.push_marker(&marker).await {
                Ok(remote_id) => match self.markers.record_sync_success(&marker, &remote_id).await {
                    Ok(true) => report.succeeded.push(marker.id),
                    Ok(false) => debug!("Marker {} changed during its push, left queued", marker.id),
                    // Deleted while the push was in flight.
                    Err(PortError::NotFound(_)) => {}
                    Err(e) => {
                        error!("Pushed marker {} but could not record it: {}", marker.id, e);
                        report.failed.push(marker.id);
                    }
                },
                Err(push_error) => {
                    warn!("Push of marker {} failed: {}", marker.id, push_error);
                    match self.markers.record_sync_failure(marker.id).await {
                        Ok(()) => report.failed.push(marker.id),
                        Err(PortError::NotFound(_)) => {}
                        Err(e) => {
                            error!("Could not mark marker {} as failed: {}", marker.id, e);
                            report.failed.push(marker.id);
                        }
                    }
                }
            }
        }

        info!(
            "Sync finished: {} succeeded, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Refreshes the shared shelter list. Returns an empty list when the
    /// remote store is unreachable.
    pub async fn fetch_remote_shelters(&self) -> Vec<RemoteShelter> {
        match self.remote.list_shelters().await {
            Ok(shelters) => {
                *self.shelters.write().await = Some(shelters.clone());
                shelters
            }
            Err(e) => {
                warn!("Could not fetch remote shelters: {}", e);
                *self.shelters.write().await = None;
                Vec::new()
            }
        }
    }

    /// Deletes every remote shelter. Local markers are left alone.
    pub async fn purge_remote_shelters(&self, role: UserRole) -> PortResult<usize> {
        if !role.is_admin() {
            warn!("Refused to purge remote shelters for role '{}'", role);
            return Err(PortError::Unauthorized(
                "Only administrators can delete evacuation centers".to_string(),
            ));
        }

        let shelters = self.remote.list_shelters().await?;
        for shelter in &shelters {
            self.remote.delete_shelter(&shelter.id).await?;
        }
        *self.shelters.write().await = Some(Vec::new());
        info!("Purged {} remote shelters", shelters.len());
        Ok(shelters.len())
    }

    /// Closest evacuation centre to the given point. Local EVACUATION_CENTER
    /// markers are considered first and win ties against remote shelters.
    /// Remote shelters come from the session cache, fetched on first use.
    pub async fn nearest_shelter(
        &self,
        home_lat: f64,
        home_lon: f64,
        include_remote: bool,
    ) -> PortResult<Option<NearestFacility>> {
        let local = self
            .markers
            .list_by_category(&HashSet::from([MarkerCategory::EvacuationCenter]))
            .await?;
        let remote = if include_remote {
            let cached = self.shelters.read().await.clone();
            match cached {
                Some(shelters) => shelters,
                None => self.fetch_remote_shelters().await,
            }
        } else {
            Vec::new()
        };

        let candidates = local
            .into_iter()
            .map(Facility::Local)
            .chain(remote.into_iter().map(Facility::Remote));

        let mut nearest: Option<NearestFacility> = None;
        for facility in candidates {
            let c = facility.coordinates();
            let distance_km = geo::distance_km(home_lat, home_lon, c.latitude, c.longitude);
            let closer = nearest
                .as_ref()
                .map_or(true, |best| distance_km < best.distance_km);
            if closer {
                nearest = Some(NearestFacility {
                    facility,
                    distance_km,
                });
            }
        }
        Ok(nearest)
    }

    /// Shelters from the most recent fetch, without touching the network.
    pub async fn cached_shelters(&self) -> Vec<RemoteShelter> {
        self.shelters.read().await.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Marker, MarkerUpdate};
    use crate::ports::Clock;
    use crate::testing::{FakeRemoteStore, FixedClock, InMemoryMarkers};
    use chrono::Duration;
    use futures::FutureExt;

    struct Fixture {
        sync: SyncCoordinator,
        markers: Arc<MarkerStore>,
        remote: Arc<FakeRemoteStore>,
        clock: Arc<FixedClock>,
    }

    fn fixture(shelters: Vec<RemoteShelter>) -> Fixture {
        let clock = FixedClock::new();
        let markers = Arc::new(MarkerStore::new(Arc::new(InMemoryMarkers::default()), clock.clone()));
        let remote = FakeRemoteStore::with_shelters(shelters);
        let sync = SyncCoordinator::new(markers.clone(), remote.clone());
        Fixture {
            sync,
            markers,
            remote,
            clock,
        }
    }

    fn shelter(id: &str, latitude: f64, longitude: f64) -> RemoteShelter {
        RemoteShelter {
            id: id.to_string(),
            name: format!("Shelter {id}"),
            latitude,
            longitude,
        }
    }

    #[tokio::test]
    async fn successful_push_marks_the_marker_synced() {
        let f = fixture(vec![]);
        let marker = f
            .markers
            .create("Gym", 13.0, 123.0, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();
        f.clock.advance(Duration::minutes(5));

        let report = f.sync.sync_pending().await.unwrap();

        assert_eq!(report.succeeded, vec![marker.id]);
        assert!(report.failed.is_empty());
        let synced = f.markers.get(marker.id).await.unwrap();
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert_eq!(synced.remote_id.as_deref(), Some("remote-0"));
        assert_eq!(synced.synced_at, Some(f.clock.now()));
    }

    #[tokio::test]
    async fn second_sync_is_a_no_op() {
        let f = fixture(vec![]);
        let marker = f
            .markers
            .create("Gym", 13.0, 123.0, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();
        f.sync.sync_pending().await.unwrap();

        let report = f.sync.sync_pending().await.unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(f.remote.push_count(marker.id), 1);
    }

    #[tokio::test]
    async fn failed_push_leaves_remote_fields_untouched_and_retries_later() {
        let f = fixture(vec![]);
        let marker = f
            .markers
            .create("Bridge", 13.0, 123.0, MarkerCategory::FloodZone, None)
            .await
            .unwrap();
        f.remote.reject(marker.id);

        let report = f.sync.sync_pending().await.unwrap();
        assert_eq!(report.failed, vec![marker.id]);
        let failed = f.markers.get(marker.id).await.unwrap();
        assert_eq!(failed.sync_status, SyncStatus::Failed);
        assert_eq!(failed.remote_id, None);
        assert_eq!(failed.synced_at, None);

        // FAILED -> FAILED
        f.sync.sync_pending().await.unwrap();
        assert_eq!(f.markers.get(marker.id).await.unwrap().sync_status, SyncStatus::Failed);

        // FAILED -> SYNCED
        f.remote.accept(marker.id);
        let report = f.sync.sync_pending().await.unwrap();
        assert_eq!(report.succeeded, vec![marker.id]);
        assert_eq!(f.remote.push_count(marker.id), 3);
    }

    #[tokio::test]
    async fn one_failure_does_not_block_other_markers() {
        let f = fixture(vec![]);
        let bad = f
            .markers
            .create("A", 13.0, 123.0, MarkerCategory::SafeArea, None)
            .await
            .unwrap();
        let good = f
            .markers
            .create("B", 13.1, 123.1, MarkerCategory::SafeArea, None)
            .await
            .unwrap();
        f.remote.reject(bad.id);

        let report = f.sync.sync_pending().await.unwrap();

        assert_eq!(report.succeeded, vec![good.id]);
        assert_eq!(report.failed, vec![bad.id]);
    }

    #[tokio::test]
    async fn edited_synced_marker_is_pushed_to_the_same_document() {
        let f = fixture(vec![]);
        let marker = f
            .markers
            .create("Gym", 13.0, 123.0, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();
        f.sync.sync_pending().await.unwrap();
        f.markers
            .update(
                marker.id,
                MarkerUpdate {
                    name: Some("Covered Court".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let requeued = f.markers.get(marker.id).await.unwrap();
        assert_eq!(requeued.sync_status, SyncStatus::Pending);
        assert_eq!(requeued.remote_id, None);

        let report = f.sync.sync_pending().await.unwrap();

        assert_eq!(report.succeeded, vec![marker.id]);
        let synced = f.markers.get(marker.id).await.unwrap();
        assert_eq!(synced.remote_id.as_deref(), Some("remote-0"));
        assert_eq!(f.remote.push_count(marker.id), 2);
    }

    #[tokio::test]
    async fn edited_marker_whose_remote_document_vanished_syncs_again() {
        let f = fixture(vec![]);
        let marker = f
            .markers
            .create("Gym", 13.0, 123.0, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();
        f.sync.sync_pending().await.unwrap();
        f.remote.gone.lock().unwrap().insert("remote-0".to_string());
        f.markers
            .update(
                marker.id,
                MarkerUpdate {
                    notes: Some(Some("Roof leaks".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = f.sync.sync_pending().await.unwrap();

        assert_eq!(report.succeeded, vec![marker.id]);
        let synced = f.markers.get(marker.id).await.unwrap();
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert_eq!(synced.remote_id.as_deref(), Some("remote-1"));
        assert_eq!(synced.remote_doc_id.as_deref(), Some("remote-1"));
    }

    #[tokio::test]
    async fn edit_during_push_keeps_the_marker_queued() {
        let f = fixture(vec![]);
        let marker = f
            .markers
            .create("Original", 13.0, 123.0, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();
        let markers = f.markers.clone();
        *f.remote.during_push.lock().unwrap() = Some(Box::new(move |pushed: &Marker| {
            let id = pushed.id;
            async move {
                markers
                    .update(
                        id,
                        MarkerUpdate {
                            name: Some("Edited mid-push".to_string()),
                            ..Default::default()
                        },
                    )
                    .await
                    .unwrap();
            }
            .boxed()
        }));

        let report = f.sync.sync_pending().await.unwrap();

        assert!(report.succeeded.is_empty());
        assert!(report.failed.is_empty());
        let stored = f.markers.get(marker.id).await.unwrap();
        assert_eq!(stored.name, "Edited mid-push");
        assert_eq!(stored.sync_status, SyncStatus::Pending);
        assert_eq!(stored.remote_id, None);

        // The next pass overwrites the document created by the first one.
        let report = f.sync.sync_pending().await.unwrap();
        assert_eq!(report.succeeded, vec![marker.id]);
        let synced = f.markers.get(marker.id).await.unwrap();
        assert_eq!(synced.sync_status, SyncStatus::Synced);
        assert_eq!(synced.remote_id.as_deref(), Some("remote-0"));
        assert_eq!(f.remote.push_count(marker.id), 2);
    }

    #[tokio::test]
    async fn shelter_fetch_failure_yields_an_empty_list() {
        let f = fixture(vec![shelter("a", 13.0, 123.0)]);
        assert_eq!(f.sync.fetch_remote_shelters().await.len(), 1);
        assert_eq!(f.sync.cached_shelters().await.len(), 1);

        *f.remote.list_fails.lock().unwrap() = true;

        assert!(f.sync.fetch_remote_shelters().await.is_empty());
        assert!(f.sync.cached_shelters().await.is_empty());
    }

    #[tokio::test]
    async fn purge_by_a_regular_user_is_refused() {
        let original = vec![shelter("a", 13.0, 123.0), shelter("b", 14.0, 121.0)];
        let f = fixture(original.clone());

        let err = f.sync.purge_remote_shelters(UserRole::User).await.unwrap_err();

        assert!(matches!(err, PortError::Unauthorized(_)));
        assert_eq!(f.sync.fetch_remote_shelters().await, original);
    }

    #[tokio::test]
    async fn purge_by_an_admin_keeps_local_markers() {
        let f = fixture(vec![shelter("a", 13.0, 123.0), shelter("b", 14.0, 121.0)]);
        f.markers
            .create("Gym", 13.0, 123.0, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();

        let removed = f.sync.purge_remote_shelters(UserRole::Admin).await.unwrap();

        assert_eq!(removed, 2);
        assert!(f.sync.fetch_remote_shelters().await.is_empty());
        assert_eq!(f.markers.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn nearest_shelter_finds_the_local_evacuation_center() {
        let f = fixture(vec![]);
        let marker = f
            .markers
            .create("Covered Court", 13.01, 123.01, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();
        // Closer, but not an evacuation centre.
        f.markers
            .create("Creek", 13.001, 123.001, MarkerCategory::FloodZone, None)
            .await
            .unwrap();

        let nearest = f.sync.nearest_shelter(13.0, 123.0, true).await.unwrap().unwrap();

        assert_eq!(nearest.facility, Facility::Local(marker));
        assert!((nearest.distance_km - 1.55).abs() < 0.05, "got {}", nearest.distance_km);
    }

    #[tokio::test]
    async fn nearest_shelter_considers_remote_only_when_asked() {
        let f = fixture(vec![shelter("near", 13.001, 123.001)]);
        f.markers
            .create("Far Gym", 13.5, 123.5, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();

        let with_remote = f.sync.nearest_shelter(13.0, 123.0, true).await.unwrap().unwrap();
        assert!(!with_remote.facility.is_local());
        assert_eq!(with_remote.facility.name(), "Shelter near");

        let local_only = f.sync.nearest_shelter(13.0, 123.0, false).await.unwrap().unwrap();
        assert!(local_only.facility.is_local());
    }

    #[tokio::test]
    async fn nearest_shelter_reuses_the_session_list() {
        let f = fixture(vec![shelter("a", 13.5, 123.5)]);

        f.sync.nearest_shelter(13.0, 123.0, true).await.unwrap();
        f.remote.shelters.lock().unwrap().push(shelter("b", 13.001, 123.001));
        let nearest = f.sync.nearest_shelter(13.0, 123.0, true).await.unwrap().unwrap();

        assert_eq!(f.remote.list_count(), 1);
        assert_eq!(nearest.facility.name(), "Shelter a");

        f.sync.fetch_remote_shelters().await;
        let nearest = f.sync.nearest_shelter(13.0, 123.0, true).await.unwrap().unwrap();
        assert_eq!(nearest.facility.name(), "Shelter b");
        assert_eq!(f.remote.list_count(), 2);
    }

    #[tokio::test]
    async fn ties_prefer_the_local_marker() {
        let f = fixture(vec![shelter("twin", 13.01, 123.01)]);
        f.markers
            .create("Twin Gym", 13.01, 123.01, MarkerCategory::EvacuationCenter, None)
            .await
            .unwrap();

        let nearest = f.sync.nearest_shelter(13.0, 123.0, true).await.unwrap().unwrap();

        assert!(nearest.facility.is_local());
    }

    #[tokio::test]
    async fn nearest_shelter_is_none_without_candidates() {
        let f = fixture(vec![]);
        assert!(f.sync.nearest_shelter(13.0, 123.0, true).await.unwrap().is_none());
    }
}
