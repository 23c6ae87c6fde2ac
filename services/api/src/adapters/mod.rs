pub mod db;
pub mod geocoder;
pub mod identity;
pub mod remote_store;
pub mod weather_api;

pub use db::DbAdapter;
pub use geocoder::NominatimAdapter;
pub use identity::HttpIdentityAdapter;
pub use remote_store::RemoteStoreAdapter;
pub use weather_api::OpenWeatherAdapter;
