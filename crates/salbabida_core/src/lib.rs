pub mod accounts;
pub mod advisory;
pub mod domain;
pub mod geo;
pub mod home;
pub mod markers;
pub mod notify;
pub mod ports;
pub mod preferences;
pub mod regions;
pub mod sync;
pub mod weather;
pub mod weather_cache;

#[cfg(test)]
mod testing;

pub use accounts::{AccountService, Session, SignUpRequest};
pub use advisory::FloodAdvisory;
pub use domain::{
    Address, Facility, HomeLocation, Marker, MarkerCategory, MarkerUpdate, NearestFacility,
    Preferences, RemoteShelter, SyncReport, SyncStatus, UserProfile, UserRole, WeatherLocation,
    WeatherObservation, WeatherSnapshot,
};
pub use geo::{distance_km, Coordinates};
pub use home::HomeLocationStore;
pub use markers::{MarkerChange, MarkerStore};
pub use ports::{
    ChangeStream, Clock, GeocodingService, HomeLocationDatabase, IdentityService, MarkerDatabase,
    PortError, PortResult, PreferenceDatabase, RemoteStoreService, SystemClock,
    UserDirectoryService, WeatherDatabase, WeatherProvider,
};
pub use preferences::PreferenceStore;
pub use sync::SyncCoordinator;
pub use weather::{Freshness, WeatherLookup, WeatherQuery, WeatherReading};
pub use weather_cache::WeatherCache;
