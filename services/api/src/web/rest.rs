//! services/api/src/web/rest.rs
//!
//! The master definition for the OpenAPI specification, the mapping from core
//! errors to HTTP responses, and the weather, sync and shelter handlers.

use crate::web::{auth, markers, settings, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use salbabida_core::{
    Facility, FloodAdvisory, Freshness, NearestFacility, PortError, RemoteShelter, SyncReport,
    WeatherQuery, WeatherReading,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_weather_handler,
        get_city_weather_handler,
        clear_weather_cache_handler,
        sync_handler,
        list_shelters_handler,
        purge_shelters_handler,
        nearest_shelter_handler,
        markers::list_markers_handler,
        markers::create_marker_handler,
        markers::get_marker_handler,
        markers::update_marker_handler,
        markers::delete_marker_handler,
        markers::near_markers_handler,
        markers::clear_markers_handler,
        settings::get_preferences_handler,
        settings::update_preferences_handler,
        settings::set_user_location_handler,
        settings::set_weather_location_handler,
        settings::clear_weather_location_handler,
        settings::get_home_handler,
        settings::set_home_handler,
        settings::clear_home_handler,
        settings::list_regions_handler,
        settings::map_center_handler,
        auth::signup_handler,
        auth::signin_handler,
        auth::signout_handler,
        auth::update_address_handler,
    ),
    components(
        schemas(
            WeatherResponse,
            AdvisoryResponse,
            SyncReportResponse,
            ShelterResponse,
            PurgeResponse,
            NearestShelterResponse,
            markers::MarkerResponse,
            markers::CreateMarkerRequest,
            markers::UpdateMarkerRequest,
            settings::PreferencesResponse,
            settings::WeatherLocationResponse,
            settings::UpdatePreferencesRequest,
            settings::CoordinatesBody,
            settings::WeatherLocationRequest,
            settings::HomeLocationRequest,
            settings::HomeLocationResponse,
            settings::RegionResponse,
            auth::SignupRequest,
            auth::SigninRequest,
            auth::AuthResponse,
            auth::AddressRequest,
            auth::AddressResponse,
        )
    ),
    tags(
        (name = "SalbaBida API", description = "Flood preparedness: weather, offline markers, evacuation centers and settings.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Converts a core error into the status/message pair handlers return.
pub fn port_error(context: &str, e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::Validation(_) => StatusCode::BAD_REQUEST,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized(_) => StatusCode::FORBIDDEN,
        PortError::Network(_) => StatusCode::BAD_GATEWAY,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("{}: {:?}", context, e);
    } else {
        warn!("{}: {}", context, e);
    }
    let message = match e {
        PortError::Validation(message)
        | PortError::NotFound(message)
        | PortError::Unauthorized(message) => message,
        PortError::Network(_) => format!("{}: remote service unavailable", context),
        PortError::Unexpected(_) => format!("{}: internal error", context),
    };
    (status, message)
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct AdvisoryResponse {
    level: String,
    title: String,
    message: String,
}

/// A weather reading together with where it came from.
#[derive(Serialize, ToSchema)]
pub struct WeatherResponse {
    location_key: String,
    location_name: String,
    temperature: f64,
    feels_like: f64,
    humidity: i32,
    pressure: i32,
    visibility: i32,
    wind_speed: f64,
    wind_direction: i32,
    wind_gust: Option<f64>,
    cloudiness: i32,
    country_code: String,
    description: String,
    icon_id: String,
    fetched_at: DateTime<Utc>,
    /// One of `fetched`, `cached` or `fallback`.
    freshness: String,
    stale: bool,
    /// Why the refresh failed, when `freshness` is `fallback`.
    refresh_error: Option<String>,
    advisory: Option<AdvisoryResponse>,
}

impl From<WeatherReading> for WeatherResponse {
    fn from(reading: WeatherReading) -> Self {
        let advisory = FloodAdvisory::assess(&reading.snapshot);
        let (freshness, refresh_error) = match reading.freshness {
            Freshness::Fetched => ("fetched", None),
            Freshness::Cached => ("cached", None),
            Freshness::Fallback { error } => ("fallback", Some(error)),
        };
        let s = reading.snapshot;
        Self {
            location_key: s.location_key,
            location_name: reading.location_name,
            temperature: s.temperature,
            feels_like: s.feels_like,
            humidity: s.humidity,
            pressure: s.pressure,
            visibility: s.visibility,
            wind_speed: s.wind_speed,
            wind_direction: s.wind_direction,
            wind_gust: s.wind_gust,
            cloudiness: s.cloudiness,
            country_code: s.country_code,
            description: s.description,
            icon_id: s.icon_id,
            fetched_at: s.fetched_at,
            freshness: freshness.to_string(),
            stale: reading.stale,
            refresh_error,
            advisory: advisory.is_alert().then(|| AdvisoryResponse {
                level: format!("{:?}", advisory),
                title: advisory.title().to_string(),
                message: advisory.message().to_string(),
            }),
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherParams {
    /// Bypass the cache even if it is fresh.
    #[serde(default)]
    refresh: bool,
}

#[derive(Serialize, ToSchema)]
pub struct SyncReportResponse {
    succeeded: Vec<Uuid>,
    failed: Vec<Uuid>,
}

impl From<SyncReport> for SyncReportResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            succeeded: report.succeeded,
            failed: report.failed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ShelterResponse {
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
}

impl From<RemoteShelter> for ShelterResponse {
    fn from(shelter: RemoteShelter) -> Self {
        Self {
            id: shelter.id,
            name: shelter.name,
            latitude: shelter.latitude,
            longitude: shelter.longitude,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PurgeResponse {
    deleted: usize,
}

#[derive(Serialize, ToSchema)]
pub struct NearestShelterResponse {
    /// `local` for a user marker, `remote` for a shared evacuation center.
    source: String,
    id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    distance_km: f64,
}

impl From<NearestFacility> for NearestShelterResponse {
    fn from(nearest: NearestFacility) -> Self {
        let c = nearest.facility.coordinates();
        let name = nearest.facility.name().to_string();
        let (source, id) = match nearest.facility {
            Facility::Local(marker) => ("local", marker.id.to_string()),
            Facility::Remote(shelter) => ("remote", shelter.id),
        };
        Self {
            source: source.to_string(),
            id,
            name,
            latitude: c.latitude,
            longitude: c.longitude,
            distance_km: nearest.distance_km,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearestParams {
    /// Defaults to the saved home location.
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default = "default_true")]
    include_remote: bool,
}

fn default_true() -> bool {
    true
}

//=========================================================================================
// Weather Handlers
//=========================================================================================

/// Weather for the location the settings point at.
#[utoipa::path(
    get,
    path = "/weather",
    params(WeatherParams),
    responses(
        (status = 200, description = "Current or last known weather", body = WeatherResponse),
        (status = 502, description = "The weather service failed and nothing is cached")
    )
)]
pub async fn get_weather_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<WeatherParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let reading = app_state
        .weather
        .current(params.refresh)
        .await
        .map_err(|e| port_error("Failed to load weather", e))?;
    Ok(Json(WeatherResponse::from(reading)))
}

/// Weather for a named city.
#[utoipa::path(
    get,
    path = "/weather/city/{name}",
    params(("name" = String, Path, description = "City or province name"), WeatherParams),
    responses(
        (status = 200, description = "Current or last known weather", body = WeatherResponse),
        (status = 502, description = "The weather service failed and nothing is cached")
    )
)]
pub async fn get_city_weather_handler(
    State(app_state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<WeatherParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "City name is required".to_string()));
    }
    let reading = app_state
        .weather
        .lookup(&WeatherQuery::City(name.clone()), &name, params.refresh)
        .await
        .map_err(|e| port_error("Failed to load weather", e))?;
    Ok(Json(WeatherResponse::from(reading)))
}

/// Drop every cached snapshot.
#[utoipa::path(
    delete,
    path = "/weather/cache",
    responses((status = 204, description = "Cache cleared"))
)]
pub async fn clear_weather_cache_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .weather
        .clear_cache()
        .await
        .map_err(|e| port_error("Failed to clear the weather cache", e))?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Sync and Shelter Handlers
//=========================================================================================

/// Push every pending or failed marker once.
#[utoipa::path(
    post,
    path = "/sync",
    responses((status = 200, description = "Per-marker outcome", body = SyncReportResponse))
)]
pub async fn sync_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let report = app_state
        .sync
        .sync_pending()
        .await
        .map_err(|e| port_error("Failed to sync markers", e))?;
    Ok(Json(SyncReportResponse::from(report)))
}

/// The shared evacuation centers. Empty when the remote store is unreachable.
#[utoipa::path(
    get,
    path = "/shelters",
    responses((status = 200, description = "Remote evacuation centers", body = [ShelterResponse]))
)]
pub async fn list_shelters_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let shelters: Vec<ShelterResponse> = app_state
        .sync
        .fetch_remote_shelters()
        .await
        .into_iter()
        .map(ShelterResponse::from)
        .collect();
    Json(shelters)
}

/// Delete every shared evacuation center. Admin only.
#[utoipa::path(
    delete,
    path = "/shelters",
    responses(
        (status = 200, description = "Number of deleted centers", body = PurgeResponse),
        (status = 403, description = "The current role is not admin")
    )
)]
pub async fn purge_shelters_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let role = app_state
        .preferences
        .role()
        .await
        .map_err(|e| port_error("Failed to read the current role", e))?;
    let deleted = app_state
        .sync
        .purge_remote_shelters(role)
        .await
        .map_err(|e| port_error("Failed to purge evacuation centers", e))?;
    Ok(Json(PurgeResponse { deleted }))
}

/// Closest evacuation center to a point, or to the saved home location.
#[utoipa::path(
    get,
    path = "/shelters/nearest",
    params(NearestParams),
    responses(
        (status = 200, description = "Nearest evacuation center", body = NearestShelterResponse),
        (status = 400, description = "No point given and no home location saved"),
        (status = 404, description = "No evacuation center known")
    )
)]
pub async fn nearest_shelter_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<NearestParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (lat, lon) = match (params.lat, params.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        (None, None) => {
            let home = app_state
                .home
                .get()
                .await
                .map_err(|e| port_error("Failed to load the home location", e))?
                .ok_or_else(|| {
                    (
                        StatusCode::BAD_REQUEST,
                        "Save a home location or pass lat and lon".to_string(),
                    )
                })?;
            (home.latitude, home.longitude)
        }
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                "lat and lon must be given together".to_string(),
            ))
        }
    };

    let nearest = app_state
        .sync
        .nearest_shelter(lat, lon, params.include_remote)
        .await
        .map_err(|e| port_error("Failed to find the nearest shelter", e))?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "No evacuation center found".to_string(),
            )
        })?;
    Ok(Json(NearestShelterResponse::from(nearest)))
}
