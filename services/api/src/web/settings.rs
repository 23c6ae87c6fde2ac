//! services/api/src/web/settings.rs
//!
//! Handlers for user preferences, the saved home location and the region
//! catalogue.

use crate::web::{rest::port_error, state::AppState};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use salbabida_core::accounts::weather_label;
use salbabida_core::regions::{self, Region};
use salbabida_core::{HomeLocation, Preferences};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, Deserialize, ToSchema, Clone, Copy, Debug, PartialEq)]
pub struct CoordinatesBody {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize, ToSchema, Clone, Debug)]
pub struct WeatherLocationResponse {
    latitude: f64,
    longitude: f64,
    name: String,
}

#[derive(Serialize, ToSchema, Clone, Debug)]
pub struct PreferencesResponse {
    selected_region: Option<String>,
    terms_accepted: bool,
    onboarding_complete: bool,
    dark_theme: bool,
    dynamic_colors: bool,
    user_location: Option<CoordinatesBody>,
    user_barangay: Option<String>,
    user_city: Option<String>,
    user_province: Option<String>,
    weather_location: Option<WeatherLocationResponse>,
    /// What the weather screen calls the user's own location.
    location_label: String,
    role: String,
    signed_in: bool,
}

impl From<Preferences> for PreferencesResponse {
    fn from(prefs: Preferences) -> Self {
        let location_label = weather_label(&prefs);
        Self {
            selected_region: prefs.selected_region,
            terms_accepted: prefs.terms_accepted,
            onboarding_complete: prefs.onboarding_complete,
            dark_theme: prefs.dark_theme,
            dynamic_colors: prefs.dynamic_colors,
            user_location: prefs.user_location.map(|c| CoordinatesBody {
                latitude: c.latitude,
                longitude: c.longitude,
            }),
            user_barangay: prefs.user_barangay,
            user_city: prefs.user_city,
            user_province: prefs.user_province,
            weather_location: prefs.weather_location.map(|w| WeatherLocationResponse {
                latitude: w.latitude,
                longitude: w.longitude,
                name: w.name,
            }),
            location_label,
            role: prefs.role.to_string(),
            signed_in: prefs.session_user_id.is_some(),
        }
    }
}

/// Scalar settings to change; omitted fields stay as they are.
#[derive(Deserialize, ToSchema, Default)]
pub struct UpdatePreferencesRequest {
    pub selected_region: Option<String>,
    pub terms_accepted: Option<bool>,
    pub onboarding_complete: Option<bool>,
    pub dark_theme: Option<bool>,
    pub dynamic_colors: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct WeatherLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct HomeLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// True when the point is the user's house rather than another pinned place.
    #[serde(default = "default_is_house")]
    pub is_house: bool,
}

fn default_is_house() -> bool {
    true
}

#[derive(Serialize, ToSchema)]
pub struct HomeLocationResponse {
    id: Uuid,
    latitude: f64,
    longitude: f64,
    is_house: bool,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<HomeLocation> for HomeLocationResponse {
    fn from(home: HomeLocation) -> Self {
        Self {
            id: home.id,
            latitude: home.latitude,
            longitude: home.longitude,
            is_house: home.is_house,
            name: home.name,
            created_at: home.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct RegionResponse {
    name: String,
    latitude: f64,
    longitude: f64,
}

impl From<&Region> for RegionResponse {
    fn from(region: &Region) -> Self {
        Self {
            name: region.name.to_string(),
            latitude: region.latitude,
            longitude: region.longitude,
        }
    }
}

//=========================================================================================
// Preference Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/preferences",
    responses((status = 200, description = "Every stored setting", body = PreferencesResponse))
)]
pub async fn get_preferences_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let prefs = app_state
        .preferences
        .load()
        .await
        .map_err(|e| port_error("Failed to load preferences", e))?;
    Ok(Json(PreferencesResponse::from(prefs)))
}

#[utoipa::path(
    patch,
    path = "/preferences",
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Settings after the change", body = PreferencesResponse),
        (status = 400, description = "Blank region name")
    )
)]
pub async fn update_preferences_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let prefs = &app_state.preferences;
    let result = async {
        if let Some(region) = &req.selected_region {
            prefs.set_selected_region(region).await?;
        }
        if let Some(accepted) = req.terms_accepted {
            prefs.set_terms_accepted(accepted).await?;
        }
        if let Some(complete) = req.onboarding_complete {
            prefs.set_onboarding_complete(complete).await?;
        }
        if let Some(enabled) = req.dark_theme {
            prefs.set_dark_theme(enabled).await?;
        }
        if let Some(enabled) = req.dynamic_colors {
            prefs.set_dynamic_colors(enabled).await?;
        }
        prefs.load().await
    }
    .await;

    let updated = result.map_err(|e| port_error("Failed to update preferences", e))?;
    Ok(Json(PreferencesResponse::from(updated)))
}

/// Store the user's own coordinates; both halves are written together.
#[utoipa::path(
    put,
    path = "/preferences/user-location",
    request_body = CoordinatesBody,
    responses(
        (status = 204, description = "Stored"),
        (status = 400, description = "Coordinates out of range")
    )
)]
pub async fn set_user_location_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CoordinatesBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .preferences
        .set_user_location(req.latitude, req.longitude)
        .await
        .map_err(|e| port_error("Failed to store the user location", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Point the weather screen at a chosen place instead of the region.
#[utoipa::path(
    put,
    path = "/preferences/weather-location",
    request_body = WeatherLocationRequest,
    responses(
        (status = 204, description = "Stored"),
        (status = 400, description = "Coordinates out of range")
    )
)]
pub async fn set_weather_location_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<WeatherLocationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .preferences
        .set_weather_location(req.latitude, req.longitude, &req.name)
        .await
        .map_err(|e| port_error("Failed to store the weather location", e))?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/preferences/weather-location",
    responses((status = 204, description = "Weather follows the region again"))
)]
pub async fn clear_weather_location_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .preferences
        .clear_weather_location()
        .await
        .map_err(|e| port_error("Failed to clear the weather location", e))?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Home Location Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/home",
    responses(
        (status = 200, description = "The saved home location", body = HomeLocationResponse),
        (status = 404, description = "Nothing saved")
    )
)]
pub async fn get_home_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let home = app_state
        .home
        .get()
        .await
        .map_err(|e| port_error("Failed to load the home location", e))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "No home location saved".to_string()))?;
    Ok(Json(HomeLocationResponse::from(home)))
}

/// Replace the saved home location.
#[utoipa::path(
    put,
    path = "/home",
    request_body = HomeLocationRequest,
    responses(
        (status = 200, description = "The new home location", body = HomeLocationResponse),
        (status = 400, description = "Coordinates out of range")
    )
)]
pub async fn set_home_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<HomeLocationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let home = app_state
        .home
        .set(req.latitude, req.longitude, req.is_house)
        .await
        .map_err(|e| port_error("Failed to save the home location", e))?;
    Ok(Json(HomeLocationResponse::from(home)))
}

#[utoipa::path(
    delete,
    path = "/home",
    responses((status = 204, description = "Home location removed"))
)]
pub async fn clear_home_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .home
        .clear()
        .await
        .map_err(|e| port_error("Failed to clear the home location", e))?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Region and Map Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/regions",
    responses((status = 200, description = "Selectable regions, sorted by name", body = [RegionResponse]))
)]
pub async fn list_regions_handler() -> impl IntoResponse {
    let regions: Vec<RegionResponse> = regions::all_regions().iter().map(RegionResponse::from).collect();
    Json(regions)
}

/// Where the map should open.
#[utoipa::path(
    get,
    path = "/map/center",
    responses((status = 200, description = "Map centre", body = CoordinatesBody))
)]
pub async fn map_center_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let home = app_state
        .home
        .get()
        .await
        .map_err(|e| port_error("Failed to load the home location", e))?;
    let prefs = app_state
        .preferences
        .load()
        .await
        .map_err(|e| port_error("Failed to load preferences", e))?;

    let center = regions::resolve_map_center(
        home.as_ref(),
        prefs.user_location,
        prefs.selected_region.as_deref(),
    );
    Ok(Json(CoordinatesBody {
        latitude: center.latitude,
        longitude: center.longitude,
    }))
}
