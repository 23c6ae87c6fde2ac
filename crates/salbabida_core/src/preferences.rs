//! crates/salbabida_core/src/preferences.rs
//!
//! Typed access to the durable scalar settings. Every setter is last-write-wins;
//! the compound setters (coordinates, address, weather override) are written in
//! a single atomic batch so readers never see half of a pair.

use std::collections::HashMap;
use std::sync::Arc;

use strum_macros::{AsRefStr, EnumIter, IntoStaticStr};
use tracing::{debug, warn};

use crate::domain::{Address, Preferences, UserRole, WeatherLocation};
use crate::geo::Coordinates;
use crate::notify::Notifier;
use crate::ports::{ChangeStream, PortError, PortResult, PreferenceDatabase};

/// Storage keys of the individual settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PreferenceKey {
    SelectedRegion,
    TermsAccepted,
    OnboardingComplete,
    DarkTheme,
    DynamicColors,
    UserLatitude,
    UserLongitude,
    UserBarangay,
    UserCity,
    UserProvince,
    WeatherLatitude,
    WeatherLongitude,
    WeatherLocationName,
    UserRole,
    SessionUserId,
}

pub struct PreferenceStore {
    db: Arc<dyn PreferenceDatabase>,
    changes: Notifier<Preferences>,
}

impl PreferenceStore {
    pub fn new(db: Arc<dyn PreferenceDatabase>) -> Self {
        Self {
            db,
            changes: Notifier::new(),
        }
    }

    /// Reads every setting now.
    pub async fn load(&self) -> PortResult<Preferences> {
        let raw = self.db.load_preferences().await?;
        Ok(parse_preferences(&raw))
    }

    /// A stream of full snapshots, one after every write.
    pub fn subscribe(&self) -> ChangeStream<Preferences> {
        self.changes.subscribe()
    }

    pub async fn role(&self) -> PortResult<UserRole> {
        Ok(self.load().await?.role)
    }

    pub async fn set_selected_region(&self, region: &str) -> PortResult<()> {
        let region = region.trim();
        if region.is_empty() {
            return Err(PortError::Validation("Region name is required".to_string()));
        }
        self.write(&[(PreferenceKey::SelectedRegion, Some(region.to_string()))])
            .await
    }

    pub async fn set_terms_accepted(&self, accepted: bool) -> PortResult<()> {
        self.write(&[(PreferenceKey::TermsAccepted, Some(accepted.to_string()))])
            .await
    }

    pub async fn set_onboarding_complete(&self, complete: bool) -> PortResult<()> {
        self.write(&[(PreferenceKey::OnboardingComplete, Some(complete.to_string()))])
            .await
    }

    pub async fn set_dark_theme(&self, enabled: bool) -> PortResult<()> {
        self.write(&[(PreferenceKey::DarkTheme, Some(enabled.to_string()))])
            .await
    }

    pub async fn set_dynamic_colors(&self, enabled: bool) -> PortResult<()> {
        self.write(&[(PreferenceKey::DynamicColors, Some(enabled.to_string()))])
            .await
    }

    pub async fn set_user_location(&self, latitude: f64, longitude: f64) -> PortResult<()> {
        ensure_valid(latitude, longitude)?;
        self.write(&[
            (PreferenceKey::UserLatitude, Some(latitude.to_string())),
            (PreferenceKey::UserLongitude, Some(longitude.to_string())),
        ])
        .await
    }

    pub async fn set_user_address(&self, address: &Address) -> PortResult<()> {
        self.write(&[
            (PreferenceKey::UserBarangay, Some(address.barangay.trim().to_string())),
            (PreferenceKey::UserCity, Some(address.city.trim().to_string())),
            (PreferenceKey::UserProvince, Some(address.province.trim().to_string())),
        ])
        .await
    }

    pub async fn set_weather_location(
        &self,
        latitude: f64,
        longitude: f64,
        name: &str,
    ) -> PortResult<()> {
        ensure_valid(latitude, longitude)?;
        self.write(&[
            (PreferenceKey::WeatherLatitude, Some(latitude.to_string())),
            (PreferenceKey::WeatherLongitude, Some(longitude.to_string())),
            (PreferenceKey::WeatherLocationName, Some(name.trim().to_string())),
        ])
        .await
    }

    pub async fn clear_weather_location(&self) -> PortResult<()> {
        self.write(&[
            (PreferenceKey::WeatherLatitude, None),
            (PreferenceKey::WeatherLongitude, None),
            (PreferenceKey::WeatherLocationName, None),
        ])
        .await
    }

    pub async fn set_role(&self, role: UserRole) -> PortResult<()> {
        self.write(&[(PreferenceKey::UserRole, Some(role.to_string()))])
            .await
    }

    pub async fn set_session_user(&self, user_id: Option<&str>) -> PortResult<()> {
        self.write(&[(PreferenceKey::SessionUserId, user_id.map(str::to_string))])
            .await
    }

    pub async fn start_session(&self, user_id: &str, role: UserRole) -> PortResult<()> {
        self.write(&[
            (PreferenceKey::SessionUserId, Some(user_id.to_string())),
            (PreferenceKey::UserRole, Some(role.to_string())),
        ])
        .await
    }

    /// Signs the local session out: forgets the user and drops back to the
    /// least-privileged role, in one batch.
    pub async fn clear_session(&self) -> PortResult<()> {
        self.write(&[
            (PreferenceKey::SessionUserId, None),
            (PreferenceKey::UserRole, Some(UserRole::User.to_string())),
        ])
        .await
    }

    async fn write(&self, entries: &[(PreferenceKey, Option<String>)]) -> PortResult<()> {
        let batch: Vec<(&str, Option<String>)> = entries
            .iter()
            .map(|(key, value)| (key.as_ref(), value.clone()))
            .collect();
        self.db.write_preferences(&batch).await?;
        debug!(
            "Updated preferences: {:?}",
            entries.iter().map(|(key, _)| key.as_ref()).collect::<Vec<_>>()
        );

        // Notification is best effort; the write above already succeeded.
        match self.load().await {
            Ok(snapshot) => self.changes.publish(snapshot),
            Err(e) => warn!("Could not reload preferences for subscribers: {}", e),
        }
        Ok(())
    }
}

fn ensure_valid(latitude: f64, longitude: f64) -> PortResult<()> {
    if Coordinates::new(latitude, longitude).is_valid() {
        Ok(())
    } else {
        Err(PortError::Validation(format!(
            "Coordinates ({}, {}) are outside the valid range",
            latitude, longitude
        )))
    }
}

fn parse_preferences(raw: &HashMap<String, String>) -> Preferences {
    let text = |key: PreferenceKey| {
        raw.get(key.as_ref())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let flag = |key: PreferenceKey, default: bool| match raw.get(key.as_ref()) {
        Some(v) => v == "true",
        None => default,
    };
    let number = |key: PreferenceKey| {
        raw.get(key.as_ref()).and_then(|v| match v.parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Ignoring unparseable preference {} = {:?}", key.as_ref(), v);
                None
            }
        })
    };

    let user_location = match (
        number(PreferenceKey::UserLatitude),
        number(PreferenceKey::UserLongitude),
    ) {
        (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
        _ => None,
    };
    let weather_location = match (
        number(PreferenceKey::WeatherLatitude),
        number(PreferenceKey::WeatherLongitude),
    ) {
        (Some(latitude), Some(longitude)) => Some(WeatherLocation {
            latitude,
            longitude,
            name: text(PreferenceKey::WeatherLocationName).unwrap_or_default(),
        }),
        _ => None,
    };

    Preferences {
        selected_region: text(PreferenceKey::SelectedRegion),
        terms_accepted: flag(PreferenceKey::TermsAccepted, false),
        onboarding_complete: flag(PreferenceKey::OnboardingComplete, false),
        dark_theme: flag(PreferenceKey::DarkTheme, false),
        dynamic_colors: flag(PreferenceKey::DynamicColors, true),
        user_location,
        user_barangay: text(PreferenceKey::UserBarangay),
        user_city: text(PreferenceKey::UserCity),
        user_province: text(PreferenceKey::UserProvince),
        weather_location,
        role: text(PreferenceKey::UserRole)
            .map(|r| UserRole::from_stored(&r))
            .unwrap_or_default(),
        session_user_id: text(PreferenceKey::SessionUserId),
    }
}
