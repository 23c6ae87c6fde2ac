//! crates/salbabida_core/src/weather.rs
//!
//! Read-through weather lookup. Decides which location to report on, serves
//! the cache while it is fresh, refreshes it otherwise, and falls back to
//! whatever is cached when the remote service is unreachable.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{Preferences, WeatherSnapshot};
use crate::ports::{PortError, PortResult, WeatherProvider};
use crate::preferences::PreferenceStore;
use crate::regions::DEFAULT_WEATHER_CITY;
use crate::weather_cache::WeatherCache;

/// What to ask the weather service for.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Coordinates { latitude: f64, longitude: f64 },
    City(String),
}

impl WeatherQuery {
    /// The cache key for this query.
    ///
    /// Coordinates are truncated toward zero to whole degrees; every point in
    /// the same degree square shares one entry.
    pub fn location_key(&self) -> String {
        match self {
            WeatherQuery::Coordinates {
                latitude,
                longitude,
            } => format!("{}_{}", latitude.trunc() as i64, longitude.trunc() as i64),
            WeatherQuery::City(name) => name.clone(),
        }
    }

    /// Picks the query from the settings: the weather override, then the
    /// selected region, then the default city.
    pub fn from_preferences(prefs: &Preferences) -> Self {
        if let Some(location) = &prefs.weather_location {
            return WeatherQuery::Coordinates {
                latitude: location.latitude,
                longitude: location.longitude,
            };
        }
        WeatherQuery::City(
            prefs
                .selected_region
                .clone()
                .unwrap_or_else(|| DEFAULT_WEATHER_CITY.to_string()),
        )
    }
}

/// Where a returned snapshot came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Freshness {
    /// Just fetched from the remote service.
    Fetched,
    /// Served from the cache without a fetch.
    Cached,
    /// The refresh failed; this is the last known data, possibly stale.
    Fallback { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReading {
    pub snapshot: WeatherSnapshot,
    /// Name to show above the reading.
    pub location_name: String,
    pub freshness: Freshness,
    pub stale: bool,
}

pub struct WeatherLookup {
    cache: Arc<WeatherCache>,
    preferences: Arc<PreferenceStore>,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherLookup {
    pub fn new(
        cache: Arc<WeatherCache>,
        preferences: Arc<PreferenceStore>,
        provider: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            cache,
            preferences,
            provider,
        }
    }

    /// Weather for the location the user's settings point at.
    pub async fn current(&self, force_refresh: bool) -> PortResult<WeatherReading> {
        let prefs = self.preferences.load().await?;
        let query = WeatherQuery::from_preferences(&prefs);
        let label = match (&prefs.weather_location, &query) {
            (Some(location), _) if !location.name.is_empty() => location.name.clone(),
            (_, WeatherQuery::City(city)) => city.clone(),
            (_, WeatherQuery::Coordinates { .. }) => "Current Location".to_string(),
        };
        self.lookup(&query, &label, force_refresh).await
    }

    /// Weather for an explicit query. Errors only when the fetch fails and
    /// nothing at all is cached for the key.
    pub async fn lookup(
        &self,
        query: &WeatherQuery,
        label: &str,
        force_refresh: bool,
    ) -> PortResult<WeatherReading> {
        let key = query.location_key();
        let cached = self.cache.get(&key).await?;

        if let Some(snapshot) = &cached {
            if !force_refresh && !self.cache.is_stale(snapshot) {
                return Ok(WeatherReading {
                    snapshot: snapshot.clone(),
                    location_name: label.to_string(),
                    freshness: Freshness::Cached,
                    stale: false,
                });
            }
        }

        let fetched = match query {
            WeatherQuery::Coordinates {
                latitude,
                longitude,
            } => self.provider.fetch_by_coordinates(*latitude, *longitude).await,
            WeatherQuery::City(city) => self.provider.fetch_by_city(city).await,
        };

        match fetched {
            Ok(observation) => {
                let now = self.cache.clock().now();
                let snapshot = WeatherSnapshot::from_observation(key.clone(), observation, now);
                self.cache.put(&snapshot).await?;
                info!("Refreshed weather for {}", key);
                let location_name = if snapshot.location_name.is_empty() {
                    label.to_string()
                } else {
                    snapshot.location_name.clone()
                };
                Ok(WeatherReading {
                    snapshot,
                    location_name,
                    freshness: Freshness::Fetched,
                    stale: false,
                })
            }
            Err(e) => match cached {
                Some(snapshot) => {
                    warn!("Weather refresh for {} failed, serving cached data: {}", key, e);
                    let stale = self.cache.is_stale(&snapshot);
                    Ok(WeatherReading {
                        snapshot,
                        location_name: label.to_string(),
                        freshness: Freshness::Fallback {
                            error: e.to_string(),
                        },
                        stale,
                    })
                }
                None => {
                    warn!("Weather fetch for {} failed with nothing cached: {}", key, e);
                    Err(match e {
                        PortError::Network(message) => PortError::Network(message),
                        other => PortError::Network(other.to_string()),
                    })
                }
            },
        }
    }

    pub async fn clear_cache(&self) -> PortResult<u64> {
        self.cache.clear_all().await
    }
}
