//! services/api/src/adapters/geocoder.rs
//!
//! Nominatim forward geocoding, limited to the Philippines.
//!
//! The public instance allows one request per second; callers only geocode on
//! sign-up and on explicit address changes, so no throttling is done here.

use async_trait::async_trait;
use salbabida_core::geo::Coordinates;
use salbabida_core::ports::{GeocodingService, PortError, PortResult};
use tracing::{debug, warn};

pub struct NominatimAdapter {
    client: reqwest::Client,
    search_url: String,
}

impl NominatimAdapter {
    pub fn new(client: reqwest::Client, search_url: String) -> Self {
        Self { client, search_url }
    }
}

#[async_trait]
impl GeocodingService for NominatimAdapter {
    async fn geocode(&self, query: &str) -> PortResult<Option<Coordinates>> {
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("q", query),
                ("countrycodes", "ph"),
                ("format", "jsonv2"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Geocoder rate limit hit");
            return Err(PortError::Network("Geocoder rate limited".to_string()));
        }
        if !response.status().is_success() {
            return Err(PortError::Network(format!(
                "Geocoder returned {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        let found = parse_response(&body)?;
        debug!("Geocoded '{}' to {:?}", query, found);
        Ok(found)
    }
}

/// Parses a Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> PortResult<Option<Coordinates>> {
    let results = body
        .as_array()
        .ok_or_else(|| PortError::Network("Geocoder response is not an array".to_string()))?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let coordinate = |field: &str| {
        first[field]
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or_else(|| PortError::Network(format!("Missing {} in geocoder response", field)))
    };

    Ok(Some(Coordinates::new(coordinate("lat")?, coordinate("lon")?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_first_result() {
        let body = serde_json::json!([
            { "lat": "13.1391", "lon": "123.7438", "display_name": "Legazpi, Albay" },
            { "lat": "0", "lon": "0" }
        ]);
        let found = parse_response(&body).unwrap().unwrap();
        assert!((found.latitude - 13.1391).abs() < 1e-4);
        assert!((found.longitude - 123.7438).abs() < 1e-4);
    }

    #[test]
    fn empty_result_is_no_match() {
        assert!(parse_response(&serde_json::json!([])).unwrap().is_none());
    }

    #[test]
    fn malformed_result_is_an_error() {
        assert!(parse_response(&serde_json::json!({ "error": "bad" })).is_err());
        assert!(parse_response(&serde_json::json!([{ "lat": "x", "lon": "1" }])).is_err());
    }
}
