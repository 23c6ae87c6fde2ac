//! services/api/src/config.rs
//!
//! Service settings: where to listen, which SQLite file to open and where the
//! weather, document-store, identity and geocoding services live. Read once
//! from the environment at startup; a `.env` file is honoured in development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub weather_api_url: String,
    pub weather_api_key: Option<String>,
    pub remote_store_url: String,
    pub remote_store_token: Option<String>,
    pub identity_url: String,
    pub geocoder_url: String,
    pub http_timeout: Duration,
    pub cors_origin: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` outside of tests.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server and Database Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            var("DATABASE_URL").unwrap_or_else(|| "sqlite://salbabida.db?mode=rwc".to_string());

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Remote Services ---
        let weather_api_url = var("WEATHER_API_URL")
            .unwrap_or_else(|| DEFAULT_WEATHER_API_URL.to_string());
        let weather_api_key = var("WEATHER_API_KEY");

        let remote_store_url = var("REMOTE_STORE_URL")
            .ok_or_else(|| ConfigError::MissingVar("REMOTE_STORE_URL".to_string()))?;
        let remote_store_token = var("REMOTE_STORE_TOKEN");
        let identity_url = var("IDENTITY_URL").unwrap_or_else(|| remote_store_url.clone());
        let geocoder_url = var("GEOCODER_URL").unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string());

        let timeout_str = var("HTTP_TIMEOUT_SECS").unwrap_or_else(|| "15".to_string());
        let http_timeout = match timeout_str.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(ConfigError::InvalidValue(
                    "HTTP_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", timeout_str),
                ))
            }
        };

        let cors_origin =
            var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            weather_api_url: weather_api_url.trim_end_matches('/').to_string(),
            weather_api_key,
            remote_store_url: remote_store_url.trim_end_matches('/').to_string(),
            remote_store_token,
            identity_url: identity_url.trim_end_matches('/').to_string(),
            geocoder_url,
            http_timeout,
            cors_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_fill_everything_but_the_remote_store() {
        let config = load(&[("REMOTE_STORE_URL", "https://store.example.ph/v1/")]).unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.database_url, "sqlite://salbabida.db?mode=rwc");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.remote_store_url, "https://store.example.ph/v1");
        assert_eq!(config.identity_url, "https://store.example.ph/v1");
        assert_eq!(config.weather_api_url, DEFAULT_WEATHER_API_URL);
        assert_eq!(config.http_timeout, Duration::from_secs(15));
        assert!(config.weather_api_key.is_none());
    }

    #[test]
    fn remote_store_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(v)) if v == "REMOTE_STORE_URL"));
    }

    #[test]
    fn bad_values_are_reported() {
        let base = ("REMOTE_STORE_URL", "http://localhost:9000");
        assert!(matches!(
            load(&[base, ("BIND_ADDRESS", "nowhere")]),
            Err(ConfigError::InvalidValue(v, _)) if v == "BIND_ADDRESS"
        ));
        assert!(matches!(
            load(&[base, ("RUST_LOG", "loud")]),
            Err(ConfigError::InvalidValue(v, _)) if v == "RUST_LOG"
        ));
        assert!(matches!(
            load(&[base, ("HTTP_TIMEOUT_SECS", "0")]),
            Err(ConfigError::InvalidValue(v, _)) if v == "HTTP_TIMEOUT_SECS"
        ));
    }
}
