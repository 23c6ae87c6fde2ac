//! services/api/src/adapters/weather_api.rs
//!
//! OpenWeatherMap-compatible implementation of the `WeatherProvider` port.
//! Every field of the payload is optional upstream; missing numbers become zero.

use async_trait::async_trait;
use salbabida_core::domain::WeatherObservation;
use salbabida_core::ports::{PortError, PortResult, WeatherProvider};
use serde::Deserialize;
use tracing::{debug, error};

pub struct OpenWeatherAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherAdapter {
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    async fn fetch(&self, query: &[(&str, String)]) -> PortResult<WeatherObservation> {
        let mut params: Vec<(&str, String)> = query.to_vec();
        params.push(("units", "metric".to_string()));
        if let Some(key) = &self.api_key {
            params.push(("appid", key.clone()));
        }

        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Weather request failed: {}", e);
                PortError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Weather service answered {}: {}", status, body);
            return Err(PortError::Network(format!("Weather service returned {}", status)));
        }

        let payload: WeatherPayload = response
            .json()
            .await
            .map_err(|e| PortError::Network(format!("Malformed weather response: {}", e)))?;
        debug!("Received weather for '{}'", payload.name.as_deref().unwrap_or_default());
        Ok(payload.into_observation())
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherAdapter {
    async fn fetch_by_city(&self, city: &str) -> PortResult<WeatherObservation> {
        self.fetch(&[("q", city.to_string())]).await
    }

    async fn fetch_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> PortResult<WeatherObservation> {
        self.fetch(&[("lat", latitude.to_string()), ("lon", longitude.to_string())])
            .await
    }
}

//=========================================================================================
// Wire format
//=========================================================================================

/// Every section may be absent or `null`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WeatherPayload {
    name: Option<String>,
    main: Option<MainSection>,
    wind: Option<WindSection>,
    clouds: Option<CloudSection>,
    sys: Option<SysSection>,
    weather: Option<Vec<ConditionSection>>,
    visibility: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MainSection {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<i32>,
    pressure: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WindSection {
    speed: Option<f64>,
    deg: Option<i32>,
    gust: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CloudSection {
    all: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SysSection {
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConditionSection {
    description: Option<String>,
    icon: Option<String>,
}

impl WeatherPayload {
    fn into_observation(self) -> WeatherObservation {
        let main = self.main.unwrap_or_default();
        let wind = self.wind.unwrap_or_default();
        let condition = self
            .weather
            .and_then(|conditions| conditions.into_iter().next())
            .unwrap_or_default();
        WeatherObservation {
            location_name: self.name.unwrap_or_default(),
            temperature: main.temp.unwrap_or(0.0),
            feels_like: main.feels_like.unwrap_or(0.0),
            humidity: main.humidity.unwrap_or(0),
            pressure: main.pressure.unwrap_or(0),
            visibility: self.visibility.unwrap_or(0),
            wind_speed: wind.speed.unwrap_or(0.0),
            wind_direction: wind.deg.unwrap_or(0),
            wind_gust: wind.gust,
            cloudiness: self.clouds.and_then(|c| c.all).unwrap_or(0),
            country_code: self.sys.and_then(|s| s.country).unwrap_or_default(),
            description: condition.description.unwrap_or_default(),
            icon_id: condition.icon.unwrap_or_default(),
        }
    }
}
