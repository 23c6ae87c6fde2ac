//! crates/salbabida_core/src/advisory.rs
//!
//! Flood advisory derived from a weather snapshot's description, humidity and
//! cloud cover.

use crate::domain::WeatherSnapshot;

const HIGH_HUMIDITY: i32 = 85;
const HEAVY_CLOUD_COVER: i32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodAdvisory {
    SevereWeather,
    HeavyRain,
    Rainy,
    HighHumidity,
    None,
}

impl FloodAdvisory {
    /// Checks run from most to least severe; the first match wins.
    pub fn assess(snapshot: &WeatherSnapshot) -> Self {
        let description = snapshot.description.to_lowercase();
        let rainy = ["rain", "storm", "thunderstorm", "drizzle"]
            .iter()
            .any(|term| description.contains(term));
        let humid_and_overcast =
            snapshot.humidity > HIGH_HUMIDITY && snapshot.cloudiness > HEAVY_CLOUD_COVER;

        if description.contains("thunderstorm") || description.contains("storm") {
            FloodAdvisory::SevereWeather
        } else if description.contains("heavy rain") {
            FloodAdvisory::HeavyRain
        } else if rainy {
            FloodAdvisory::Rainy
        } else if humid_and_overcast {
            FloodAdvisory::HighHumidity
        } else {
            FloodAdvisory::None
        }
    }

    pub fn is_alert(self) -> bool {
        self != FloodAdvisory::None
    }

    pub fn title(self) -> &'static str {
        match self {
            FloodAdvisory::SevereWeather => "Severe Weather Alert",
            FloodAdvisory::HeavyRain => "Heavy Rain Warning",
            FloodAdvisory::Rainy => "Rainy Conditions",
            FloodAdvisory::HighHumidity => "High Humidity",
            FloodAdvisory::None => "",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FloodAdvisory::SevereWeather => "Flash floods possible in low lying areas. Seek shelter.",
            FloodAdvisory::HeavyRain => "High risk of flooding. Monitor local advisories.",
            FloodAdvisory::Rainy => "Roads may be slippery. Low flood risk but stay alert.",
            FloodAdvisory::HighHumidity => {
                "Conditions are favorable for rain. Keep an umbrella handy."
            }
            FloodAdvisory::None => "",
        }
    }
}
