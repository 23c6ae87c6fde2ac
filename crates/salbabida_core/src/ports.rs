//! crates/salbabida_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific implementations like SQLite or HTTP clients.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use uuid::Uuid;

use crate::domain::{
    HomeLocation, Marker, RemoteShelter, SyncStatus, UserProfile, WeatherObservation,
    WeatherSnapshot,
};
use crate::geo::Coordinates;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and core operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// Bad input; surfaced to the user as-is and never retried.
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A remote fetch or write failed.
    #[error("Network error: {0}")]
    Network(String),
    /// A privileged operation was attempted without the required role.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A boxed stream of change notifications.
pub type ChangeStream<T> = Pin<Box<dyn Stream<Item = T> + Send>>;

//=========================================================================================
// Local Storage Ports
//=========================================================================================

#[async_trait]
pub trait MarkerDatabase: Send + Sync {
    async fn insert_marker(&self, marker: &Marker) -> PortResult<()>;

    async fn get_marker(&self, id: Uuid) -> PortResult<Option<Marker>>;

    /// Rewrites name, category, notes and the sync fields of an existing
    /// marker and bumps its revision.
    async fn update_marker(&self, marker: &Marker) -> PortResult<()>;

    /// Records a successful push of `revision`. The remote document id is
    /// always stored. Status, time and `remote_id` change together, and only
    /// if the marker is still at `revision`; returns `false` otherwise.
    async fn mark_synced(
        &self,
        id: Uuid,
        revision: i64,
        synced_at: DateTime<Utc>,
        remote_id: &str,
    ) -> PortResult<bool>;

    /// Records a failed push, leaving `synced_at` and `remote_id` untouched.
    async fn mark_failed(&self, id: Uuid) -> PortResult<()>;

    /// Returns `false` if no marker had that id.
    async fn delete_marker(&self, id: Uuid) -> PortResult<bool>;

    /// All markers, newest first.
    async fn list_markers(&self) -> PortResult<Vec<Marker>>;

    async fn list_markers_by_status(&self, status: SyncStatus) -> PortResult<Vec<Marker>>;

    /// Returns the number of deleted rows.
    async fn clear_markers(&self) -> PortResult<u64>;
}

#[async_trait]
pub trait WeatherDatabase: Send + Sync {
    async fn get_snapshot(&self, location_key: &str) -> PortResult<Option<WeatherSnapshot>>;

    /// Inserts or wholesale replaces the snapshot stored under its key.
    async fn upsert_snapshot(&self, snapshot: &WeatherSnapshot) -> PortResult<()>;

    async fn clear_snapshots(&self) -> PortResult<u64>;
}

#[async_trait]
pub trait HomeLocationDatabase: Send + Sync {
    async fn get_home_location(&self) -> PortResult<Option<HomeLocation>>;

    /// Deletes any existing row and inserts `home` as the only one.
    async fn replace_home_location(&self, home: &HomeLocation) -> PortResult<()>;

    async fn delete_home_location(&self) -> PortResult<()>;
}

#[async_trait]
pub trait PreferenceDatabase: Send + Sync {
    async fn load_preferences(&self) -> PortResult<HashMap<String, String>>;

    /// Applies every entry atomically. `None` removes the key.
    async fn write_preferences(&self, entries: &[(&str, Option<String>)]) -> PortResult<()>;
}

//=========================================================================================
// Remote Service Ports
//=========================================================================================

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_by_city(&self, city: &str) -> PortResult<WeatherObservation>;

    async fn fetch_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> PortResult<WeatherObservation>;
}

#[async_trait]
pub trait RemoteStoreService: Send + Sync {
    /// Lists the shared `evacuation_centers` collection.
    async fn list_shelters(&self) -> PortResult<Vec<RemoteShelter>>;

    async fn delete_shelter(&self, shelter_id: &str) -> PortResult<()>;

    /// Writes a marker to the remote collection and returns its document id.
    /// Markers that carry a `remote_doc_id` overwrite that document; if it no
    /// longer exists a new one is created.
    async fn push_marker(&self, marker: &Marker) -> PortResult<String>;
}

#[async_trait]
pub trait UserDirectoryService: Send + Sync {
    async fn get_user(&self, user_id: &str) -> PortResult<Option<UserProfile>>;

    async fn put_user(&self, user_id: &str, profile: &UserProfile) -> PortResult<()>;
}

/// Opaque email/password identity provider.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Creates an account and returns the new user id.
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<String>;

    /// Returns the user id of the signed-in account.
    async fn sign_in(&self, email: &str, password: &str) -> PortResult<String>;

    async fn sign_out(&self, user_id: &str) -> PortResult<()>;
}

#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Forward-geocodes a free-text address. `Ok(None)` means no match.
    async fn geocode(&self, query: &str) -> PortResult<Option<Coordinates>>;
}

//=========================================================================================
// Time
//=========================================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
