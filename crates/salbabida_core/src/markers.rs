//! crates/salbabida_core/src/markers.rs
//!
//! The offline marker store: durable user-created markers tagged with a sync
//! status, plus the category, sync and proximity filters the map screen uses.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{Marker, MarkerCategory, MarkerUpdate, SyncStatus};
use crate::geo::{distance_km, Coordinates};
use crate::notify::Notifier;
use crate::ports::{ChangeStream, Clock, MarkerDatabase, PortError, PortResult};

/// Markers further than this from the viewport centre are not drawn.
pub const DEFAULT_VISIBILITY_RADIUS_KM: f64 = 50.0;

/// Something changed in the marker table.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerChange {
    Created(Uuid),
    Updated(Uuid),
    Deleted(Uuid),
    SyncStatusChanged { id: Uuid, status: SyncStatus },
    Cleared,
}

pub struct MarkerStore {
    db: Arc<dyn MarkerDatabase>,
    clock: Arc<dyn Clock>,
    changes: Notifier<MarkerChange>,
}

impl MarkerStore {
    pub fn new(db: Arc<dyn MarkerDatabase>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            changes: Notifier::new(),
        }
    }

    /// Creates a PENDING marker. Fails with `Validation` on a blank name or
    /// impossible coordinates, in which case nothing is stored.
    pub async fn create(
        &self,
        name: &str,
        latitude: f64,
        longitude: f64,
        category: MarkerCategory,
        notes: Option<&str>,
    ) -> PortResult<Marker> {
        let name = validate_name(name)?;
        if !Coordinates::new(latitude, longitude).is_valid() {
            return Err(PortError::Validation(format!(
                "Coordinates ({}, {}) are outside the valid range",
                latitude, longitude
            )));
        }

        let marker = Marker {
            id: Uuid::new_v4(),
            name,
            latitude,
            longitude,
            category,
            notes: normalize_notes(notes),
            sync_status: SyncStatus::Pending,
            created_at: self.clock.now(),
            synced_at: None,
            remote_id: None,
            remote_doc_id: None,
            revision: 0,
        };
        self.db.insert_marker(&marker).await?;
        info!("Created {} marker {} ({})", marker.category, marker.id, marker.name);
        self.changes.publish(MarkerChange::Created(marker.id));
        Ok(marker)
    }

    pub async fn get(&self, id: Uuid) -> PortResult<Marker> {
        self.db
            .get_marker(id)
            .await?
            .ok_or_else(|| PortError::NotFound(format!("Marker {} not found", id)))
    }

    /// Applies an edit. A marker that was already SYNCED goes back to PENDING
    /// so the edited content reaches the remote collection. The next push
    /// overwrites the document named by `remote_doc_id`.
    pub async fn update(&self, id: Uuid, update: MarkerUpdate) -> PortResult<Marker> {
        let mut marker = self.get(id).await?;

        if let Some(name) = update.name {
            marker.name = validate_name(&name)?;
        }
        if let Some(category) = update.category {
            marker.category = category;
        }
        if let Some(notes) = update.notes {
            marker.notes = normalize_notes(notes.as_deref());
        }
        if marker.sync_status == SyncStatus::Synced {
            debug!("Marker {} edited after sync, re-queueing", id);
            marker.sync_status = SyncStatus::Pending;
            marker.synced_at = None;
            marker.remote_id = None;
        }
        marker.revision += 1;

        self.db.update_marker(&marker).await?;
        self.changes.publish(MarkerChange::Updated(id));
        Ok(marker)
    }

    /// Removes a marker. Unknown ids are reported as `NotFound`.
    pub async fn delete(&self, id: Uuid) -> PortResult<()> {
        if !self.db.delete_marker(id).await? {
            return Err(PortError::NotFound(format!("Marker {} not found", id)));
        }
        info!("Deleted marker {}", id);
        self.changes.publish(MarkerChange::Deleted(id));
        Ok(())
    }

    /// Newest first.
    pub async fn list_all(&self) -> PortResult<Vec<Marker>> {
        self.db.list_markers().await
    }

    pub async fn list_by_category(
        &self,
        categories: &HashSet<MarkerCategory>,
    ) -> PortResult<Vec<Marker>> {
        let markers = self.db.list_markers().await?;
        Ok(markers
            .into_iter()
            .filter(|m| categories.contains(&m.category))
            .collect())
    }

    pub async fn list_by_sync(&self, status: SyncStatus) -> PortResult<Vec<Marker>> {
        self.db.list_markers_by_status(status).await
    }

    /// Markers in `categories` within `radius_km` (inclusive) of the centre.
    pub async fn list_near(
        &self,
        center_latitude: f64,
        center_longitude: f64,
        radius_km: f64,
        categories: &HashSet<MarkerCategory>,
    ) -> PortResult<Vec<Marker>> {
        let markers = self.list_by_category(categories).await?;
        Ok(markers
            .into_iter()
            .filter(|m| {
                distance_km(center_latitude, center_longitude, m.latitude, m.longitude)
                    <= radius_km
            })
            .collect())
    }

    /// Deletes every marker regardless of its sync status.
    pub async fn clear_all(&self) -> PortResult<u64> {
        let removed = self.db.clear_markers().await?;
        info!("Cleared {} markers", removed);
        self.changes.publish(MarkerChange::Cleared);
        Ok(removed)
    }

    pub fn subscribe(&self) -> ChangeStream<MarkerChange> {
        self.changes.subscribe()
    }

    /// Marks `pushed` as SYNCED unless it was edited after the push started,
    /// in which case it stays queued and `false` is returned.
    pub(crate) async fn record_sync_success(&self, pushed: &Marker, remote_id: &str) -> PortResult<bool> {
        let synced = self
            .db
            .mark_synced(pushed.id, pushed.revision, self.clock.now(), remote_id)
            .await?;
        if synced {
            self.changes.publish(MarkerChange::SyncStatusChanged {
                id: pushed.id,
                status: SyncStatus::Synced,
            });
        }
        Ok(synced)
    }

    pub(crate) async fn record_sync_failure(&self, id: Uuid) -> PortResult<()> {
        self.db.mark_failed(id).await?;
        self.changes.publish(MarkerChange::SyncStatusChanged {
            id,
            status: SyncStatus::Failed,
        });
        Ok(())
    }
}

fn validate_name(name: &str) -> PortResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PortError::Validation("Marker name is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
