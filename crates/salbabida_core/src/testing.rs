//! In-memory implementations of the ports, used by the unit tests of the core services.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::domain::{
    HomeLocation, Marker, RemoteShelter, SyncStatus, UserProfile, WeatherObservation,
    WeatherSnapshot,
};
use crate::geo::Coordinates;
use crate::ports::{
    Clock, GeocodingService, HomeLocationDatabase, IdentityService, MarkerDatabase, PortError,
    PortResult, PreferenceDatabase, RemoteStoreService, UserDirectoryService, WeatherDatabase,
    WeatherProvider,
};

//=========================================================================================
// Clock
//=========================================================================================

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap()),
        })
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

//=========================================================================================
// Local storage
//=========================================================================================

#[derive(Default)]
pub struct InMemoryMarkers {
    rows: Mutex<Vec<Marker>>,
}

#[async_trait]
impl MarkerDatabase for InMemoryMarkers {
    async fn insert_marker(&self, marker: &Marker) -> PortResult<()> {
        self.rows.lock().unwrap().push(marker.clone());
        Ok(())
    }

    async fn get_marker(&self, id: Uuid) -> PortResult<Option<Marker>> {
        Ok(self.rows.lock().unwrap().iter().find(|m| m.id == id).cloned())
    }

    async fn update_marker(&self, marker: &Marker) -> PortResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.id == marker.id)
            .ok_or_else(|| PortError::NotFound(marker.id.to_string()))?;
        row.name = marker.name.clone();
        row.category = marker.category;
        row.notes = marker.notes.clone();
        row.sync_status = marker.sync_status;
        row.synced_at = marker.synced_at;
        row.remote_id = marker.remote_id.clone();
        row.revision += 1;
        Ok(())
    }

    async fn mark_synced(
        &self,
        id: Uuid,
        revision: i64,
        synced_at: DateTime<Utc>,
        remote_id: &str,
    ) -> PortResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))?;
        row.remote_doc_id = Some(remote_id.to_string());
        if row.revision != revision {
            return Ok(false);
        }
        row.sync_status = SyncStatus::Synced;
        row.synced_at = Some(synced_at);
        row.remote_id = Some(remote_id.to_string());
        Ok(true)
    }

    async fn mark_failed(&self, id: Uuid) -> PortResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| PortError::NotFound(id.to_string()))?;
        row.sync_status = SyncStatus::Failed;
        Ok(())
    }

    async fn delete_marker(&self, id: Uuid) -> PortResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|m| m.id != id);
        Ok(rows.len() != before)
    }

    async fn list_markers(&self) -> PortResult<Vec<Marker>> {
        let mut markers: Vec<Marker> = self.rows.lock().unwrap().iter().rev().cloned().collect();
        markers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(markers)
    }

    async fn list_markers_by_status(&self, status: SyncStatus) -> PortResult<Vec<Marker>> {
        let markers = self.list_markers().await?;
        Ok(markers.into_iter().filter(|m| m.sync_status == status).collect())
    }

    async fn clear_markers(&self) -> PortResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let count = rows.len() as u64;
        rows.clear();
        Ok(count)
    }
}

#[derive(Default)]
pub struct InMemoryWeather {
    rows: Mutex<HashMap<String, WeatherSnapshot>>,
}

#[async_trait]
impl WeatherDatabase for InMemoryWeather {
    async fn get_snapshot(&self, location_key: &str) -> PortResult<Option<WeatherSnapshot>> {
        Ok(self.rows.lock().unwrap().get(location_key).cloned())
    }

    async fn upsert_snapshot(&self, snapshot: &WeatherSnapshot) -> PortResult<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(snapshot.location_key.clone(), snapshot.clone());
        Ok(())
    }

    async fn clear_snapshots(&self) -> PortResult<u64> {
        let mut rows = self.rows.lock().unwrap();
        let count = rows.len() as u64;
        rows.clear();
        Ok(count)
    }
}

#[derive(Default)]
pub struct InMemoryHome {
    row: Mutex<Option<HomeLocation>>,
}

#[async_trait]
impl HomeLocationDatabase for InMemoryHome {
    async fn get_home_location(&self) -> PortResult<Option<HomeLocation>> {
        Ok(self.row.lock().unwrap().clone())
    }

    async fn replace_home_location(&self, home: &HomeLocation) -> PortResult<()> {
        *self.row.lock().unwrap() = Some(home.clone());
        Ok(())
    }

    async fn delete_home_location(&self) -> PortResult<()> {
        *self.row.lock().unwrap() = None;
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPreferences {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryPreferences {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl PreferenceDatabase for InMemoryPreferences {
    async fn load_preferences(&self) -> PortResult<HashMap<String, String>> {
        Ok(self.values.lock().unwrap().clone())
    }

    async fn write_preferences(&self, entries: &[(&str, Option<String>)]) -> PortResult<()> {
        let mut values = self.values.lock().unwrap();
        for (key, value) in entries {
            match value {
                Some(value) => values.insert(key.to_string(), value.clone()),
                None => values.remove(*key),
            };
        }
        Ok(())
    }
}

//=========================================================================================
// Remote services
//=========================================================================================

/// Returns `observation` until `fail` is set. Counts every call.
#[derive(Default)]
pub struct FakeWeatherProvider {
    pub observation: Mutex<WeatherObservation>,
    pub fail: Mutex<bool>,
    pub calls: AtomicUsize,
    pub last_query: Mutex<Option<String>>,
}

impl FakeWeatherProvider {
    pub fn returning(observation: WeatherObservation) -> Arc<Self> {
        Arc::new(Self {
            observation: Mutex::new(observation),
            ..Default::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        let provider = Self::default();
        *provider.fail.lock().unwrap() = true;
        Arc::new(provider)
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, query: String) -> PortResult<WeatherObservation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(query);
        if *self.fail.lock().unwrap() {
            return Err(PortError::Network("connection refused".to_string()));
        }
        Ok(self.observation.lock().unwrap().clone())
    }
}

#[async_trait]
impl WeatherProvider for FakeWeatherProvider {
    async fn fetch_by_city(&self, city: &str) -> PortResult<WeatherObservation> {
        self.respond(format!("city:{city}"))
    }

    async fn fetch_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> PortResult<WeatherObservation> {
        self.respond(format!("coords:{latitude},{longitude}"))
    }
}

/// Runs once, during the next push, before the fake answers.
pub type PushHook = Box<dyn FnOnce(&Marker) -> futures::future::BoxFuture<'static, ()> + Send>;

#[derive(Default)]
pub struct FakeRemoteStore {
    pub shelters: Mutex<Vec<RemoteShelter>>,
    pub list_fails: Mutex<bool>,
    pub list_calls: AtomicUsize,
    /// Markers whose push is rejected.
    pub rejected: Mutex<HashSet<Uuid>>,
    pub pushes: Mutex<Vec<Uuid>>,
    /// Document ids that have been deleted remotely.
    pub gone: Mutex<HashSet<String>>,
    pub during_push: Mutex<Option<PushHook>>,
    next_id: AtomicUsize,
}

impl FakeRemoteStore {
    pub fn with_shelters(shelters: Vec<RemoteShelter>) -> Arc<Self> {
        Arc::new(Self {
            shelters: Mutex::new(shelters),
            ..Default::default()
        })
    }

    pub fn reject(&self, id: Uuid) {
        self.rejected.lock().unwrap().insert(id);
    }

    pub fn accept(&self, id: Uuid) {
        self.rejected.lock().unwrap().remove(&id);
    }

    pub fn push_count(&self, id: Uuid) -> usize {
        self.pushes.lock().unwrap().iter().filter(|p| **p == id).count()
    }

    pub fn list_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStoreService for FakeRemoteStore {
    async fn list_shelters(&self) -> PortResult<Vec<RemoteShelter>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if *self.list_fails.lock().unwrap() {
            return Err(PortError::Network("timed out".to_string()));
        }
        Ok(self.shelters.lock().unwrap().clone())
    }

    async fn delete_shelter(&self, shelter_id: &str) -> PortResult<()> {
        self.shelters.lock().unwrap().retain(|s| s.id != shelter_id);
        Ok(())
    }

    async fn push_marker(&self, marker: &Marker) -> PortResult<String> {
        self.pushes.lock().unwrap().push(marker.id);
        let hook = self.during_push.lock().unwrap().take();
        if let Some(hook) = hook {
            hook(marker).await;
        }
        if self.rejected.lock().unwrap().contains(&marker.id) {
            return Err(PortError::Network("503 Service Unavailable".to_string()));
        }
        // Same fallback as the HTTP adapter: a vanished document is recreated.
        if let Some(doc_id) = &marker.remote_doc_id {
            if !self.gone.lock().unwrap().contains(doc_id) {
                return Ok(doc_id.clone());
            }
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("remote-{n}"))
    }
}

#[derive(Default)]
pub struct FakeUserDirectory {
    pub users: Mutex<HashMap<String, UserProfile>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl UserDirectoryService for FakeUserDirectory {
    async fn get_user(&self, user_id: &str) -> PortResult<Option<UserProfile>> {
        if *self.fail.lock().unwrap() {
            return Err(PortError::Network("offline".to_string()));
        }
        Ok(self.users.lock().unwrap().get(user_id).cloned())
    }

    async fn put_user(&self, user_id: &str, profile: &UserProfile) -> PortResult<()> {
        if *self.fail.lock().unwrap() {
            return Err(PortError::Network("offline".to_string()));
        }
        self.users
            .lock()
            .unwrap()
            .insert(user_id.to_string(), profile.clone());
        Ok(())
    }
}

/// Accepts any password of the registered account.
#[derive(Default)]
pub struct FakeIdentity {
    pub accounts: Mutex<HashMap<String, (String, String)>>,
    pub signed_out: Mutex<Vec<String>>,
}

#[async_trait]
impl IdentityService for FakeIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<String> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(PortError::Validation("email already in use".to_string()));
        }
        let user_id = format!("uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (password.to_string(), user_id.clone()));
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<String> {
        match self.accounts.lock().unwrap().get(email) {
            Some((stored, user_id)) if stored == password => Ok(user_id.clone()),
            _ => Err(PortError::Unauthorized("invalid credentials".to_string())),
        }
    }

    async fn sign_out(&self, user_id: &str) -> PortResult<()> {
        self.signed_out.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeGeocoder {
    pub result: Mutex<Option<Coordinates>>,
    pub fail: Mutex<bool>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn resolving(coordinates: Coordinates) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Some(coordinates)),
            ..Default::default()
        })
    }
}

#[async_trait]
impl GeocodingService for FakeGeocoder {
    async fn geocode(&self, query: &str) -> PortResult<Option<Coordinates>> {
        self.queries.lock().unwrap().push(query.to_string());
        if *self.fail.lock().unwrap() {
            return Err(PortError::Network("geocoder unavailable".to_string()));
        }
        Ok(*self.result.lock().unwrap())
    }
}
