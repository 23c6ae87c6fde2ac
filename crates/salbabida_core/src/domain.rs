//! crates/salbabida_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Duration, Utc};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::geo::Coordinates;

/// Cached weather older than this many hours is eligible for a refresh.
pub const STALE_AFTER_HOURS: i64 = 12;

//=========================================================================================
// Weather
//=========================================================================================

/// One observation as returned by the remote weather service, before it is
/// bound to a cache key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeatherObservation {
    /// Display name of the place the service resolved; empty when absent.
    pub location_name: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub pressure: i32,
    pub visibility: i32,
    pub wind_speed: f64,
    pub wind_direction: i32,
    pub wind_gust: Option<f64>,
    pub cloudiness: i32,
    pub country_code: String,
    pub description: String,
    pub icon_id: String,
}

/// A fetched observation stored under a location key.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub location_key: String,
    pub location_name: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub pressure: i32,
    pub visibility: i32,
    pub wind_speed: f64,
    pub wind_direction: i32,
    pub wind_gust: Option<f64>,
    pub cloudiness: i32,
    pub country_code: String,
    pub description: String,
    pub icon_id: String,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherSnapshot {
    /// Binds an observation to `location_key`, stamped with `fetched_at`.
    pub fn from_observation(
        location_key: impl Into<String>,
        observation: WeatherObservation,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            location_key: location_key.into(),
            location_name: observation.location_name,
            temperature: observation.temperature,
            feels_like: observation.feels_like,
            humidity: observation.humidity,
            pressure: observation.pressure,
            visibility: observation.visibility,
            wind_speed: observation.wind_speed,
            wind_direction: observation.wind_direction,
            wind_gust: observation.wind_gust,
            cloudiness: observation.cloudiness,
            country_code: observation.country_code,
            description: observation.description.to_lowercase(),
            icon_id: observation.icon_id,
            fetched_at,
        }
    }

    /// True when more than twelve hours separate `fetched_at` from `now`.
    /// Exactly twelve hours is still fresh.
    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at > Duration::hours(STALE_AFTER_HOURS)
    }
}

//=========================================================================================
// Markers
//=========================================================================================

/// Kind of point of interest a user can place on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MarkerCategory {
    EvacuationCenter,
    FloodZone,
    SafeArea,
    ResourceCenter,
}

impl MarkerCategory {
    /// Every category, in the order filter UIs present them.
    pub const ALL: [MarkerCategory; 4] = [
        MarkerCategory::EvacuationCenter,
        MarkerCategory::FloodZone,
        MarkerCategory::SafeArea,
        MarkerCategory::ResourceCenter,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MarkerCategory::EvacuationCenter => "Evacuation Center",
            MarkerCategory::FloodZone => "Flood Zone",
            MarkerCategory::SafeArea => "Safe Area",
            MarkerCategory::ResourceCenter => "Resource Center",
        }
    }
}

/// Whether a marker has been mirrored to the remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    /// Pending and failed markers are both picked up by the next sync.
    pub fn needs_push(self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Failed)
    }
}

/// A user-placed point of interest.
///
/// `synced_at` and `remote_id` are set exactly when the status is SYNCED.
/// `remote_doc_id` remembers the remote document across edits so a re-push
/// overwrites it instead of creating a second one.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: MarkerCategory,
    pub notes: Option<String>,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub synced_at: Option<DateTime<Utc>>,
    pub remote_id: Option<String>,
    pub remote_doc_id: Option<String>,
    /// Bumped by every edit.
    pub revision: i64,
}

impl Marker {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Field changes requested by an edit. `None` leaves a field as it is;
/// `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default)]
pub struct MarkerUpdate {
    pub name: Option<String>,
    pub category: Option<MarkerCategory>,
    pub notes: Option<Option<String>>,
}

/// Outcome of one `sync_pending` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<Uuid>,
}

//=========================================================================================
// Home location and shelters
//=========================================================================================

/// The single saved reference point of the user.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeLocation {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    /// True when the point is literally the user's house.
    pub is_house: bool,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl HomeLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// A centrally managed evacuation center from the shared remote collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteShelter {
    /// Remote document id; only used to purge the collection.
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A candidate for "nearest shelter": either local or remote.
#[derive(Debug, Clone, PartialEq)]
pub enum Facility {
    Local(Marker),
    Remote(RemoteShelter),
}

impl Facility {
    pub fn name(&self) -> &str {
        match self {
            Facility::Local(marker) => &marker.name,
            Facility::Remote(shelter) => &shelter.name,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        match self {
            Facility::Local(marker) => marker.coordinates(),
            Facility::Remote(shelter) => Coordinates::new(shelter.latitude, shelter.longitude),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Facility::Local(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearestFacility {
    pub facility: Facility,
    pub distance_km: f64,
}

//=========================================================================================
// Users and preferences
//=========================================================================================

/// Authorization role carried in the `users` document and the preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Parses a stored role; anything unrecognised gets the least privilege.
    pub fn from_stored(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }

    pub fn is_admin(self) -> bool {
        self == UserRole::Admin
    }
}

/// Barangay, city and province the user lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub barangay: String,
    pub city: String,
    pub province: String,
}

impl Address {
    /// Free-text query handed to the geocoder.
    pub fn geocoding_query(&self) -> String {
        format!(
            "{}, {}, {}, Philippines",
            self.barangay.trim(),
            self.city.trim(),
            self.province.trim()
        )
    }
}

/// Manually chosen place the weather screen reports on.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

/// A snapshot of every durable user setting.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    pub selected_region: Option<String>,
    pub terms_accepted: bool,
    pub onboarding_complete: bool,
    pub dark_theme: bool,
    pub dynamic_colors: bool,
    pub user_location: Option<Coordinates>,
    pub user_barangay: Option<String>,
    pub user_city: Option<String>,
    pub user_province: Option<String>,
    /// Partially written overrides never surface: both coordinates or nothing.
    pub weather_location: Option<WeatherLocation>,
    pub role: UserRole,
    pub session_user_id: Option<String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            selected_region: None,
            terms_accepted: false,
            onboarding_complete: false,
            dark_theme: false,
            dynamic_colors: true,
            user_location: None,
            user_barangay: None,
            user_city: None,
            user_province: None,
            weather_location: None,
            role: UserRole::User,
            session_user_id: None,
        }
    }
}

/// The remote `users` document.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}
