//! services/api/src/web/markers.rs
//!
//! Handlers for the offline marker store.

use crate::web::{rest::port_error, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use salbabida_core::markers::DEFAULT_VISIBILITY_RADIUS_KM;
use salbabida_core::{Marker, MarkerCategory, MarkerUpdate, SyncStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct MarkerResponse {
    id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
    /// EVACUATION_CENTER, FLOOD_ZONE, SAFE_AREA or RESOURCE_CENTER.
    category: String,
    category_label: String,
    notes: Option<String>,
    /// PENDING, SYNCED or FAILED.
    sync_status: String,
    created_at: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
    remote_id: Option<String>,
}

impl From<Marker> for MarkerResponse {
    fn from(marker: Marker) -> Self {
        Self {
            id: marker.id,
            name: marker.name,
            latitude: marker.latitude,
            longitude: marker.longitude,
            category: marker.category.to_string(),
            category_label: marker.category.label().to_string(),
            notes: marker.notes,
            sync_status: marker.sync_status.to_string(),
            created_at: marker.created_at,
            synced_at: marker.synced_at,
            remote_id: marker.remote_id,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateMarkerRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub category: String,
    pub notes: Option<String>,
}

/// Omitted fields stay as they are. A blank `notes` clears the notes.
#[derive(Deserialize, ToSchema)]
pub struct UpdateMarkerRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Comma-separated categories; all when omitted.
    category: Option<String>,
    sync_status: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NearParams {
    lat: f64,
    lon: f64,
    /// Defaults to 50 km.
    radius_km: Option<f64>,
    /// Comma-separated categories; all when omitted.
    category: Option<String>,
}

fn parse_category(value: &str) -> Result<MarkerCategory, (StatusCode, String)> {
    value.trim().to_uppercase().parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown marker category '{}'", value.trim()),
        )
    })
}

fn parse_categories(value: Option<&str>) -> Result<HashSet<MarkerCategory>, (StatusCode, String)> {
    match value.filter(|v| !v.trim().is_empty()) {
        None => Ok(MarkerCategory::ALL.into_iter().collect()),
        Some(list) => list.split(',').map(parse_category).collect(),
    }
}

fn parse_sync_status(value: &str) -> Result<SyncStatus, (StatusCode, String)> {
    value.trim().to_uppercase().parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("Unknown sync status '{}'", value.trim()),
        )
    })
}

fn to_responses(markers: Vec<Marker>) -> Json<Vec<MarkerResponse>> {
    Json(markers.into_iter().map(MarkerResponse::from).collect())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List markers, newest first.
#[utoipa::path(
    get,
    path = "/markers",
    params(ListParams),
    responses(
        (status = 200, description = "Matching markers", body = [MarkerResponse]),
        (status = 400, description = "Unknown category or sync status")
    )
)]
pub async fn list_markers_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let store = &app_state.markers;
    let markers = match (params.category.as_deref(), params.sync_status.as_deref()) {
        (None, None) => store.list_all().await,
        (None, Some(status)) => store.list_by_sync(parse_sync_status(status)?).await,
        (Some(categories), status) => {
            let categories = parse_categories(Some(categories))?;
            let status = status.map(parse_sync_status).transpose()?;
            store.list_by_category(&categories).await.map(|markers| {
                markers
                    .into_iter()
                    .filter(|m| status.map_or(true, |s| m.sync_status == s))
                    .collect()
            })
        }
    }
    .map_err(|e| port_error("Failed to list markers", e))?;
    Ok(to_responses(markers))
}

/// Create a marker. It starts out PENDING.
#[utoipa::path(
    post,
    path = "/markers",
    request_body = CreateMarkerRequest,
    responses(
        (status = 201, description = "Marker created", body = MarkerResponse),
        (status = 400, description = "Blank name, bad coordinates or unknown category")
    )
)]
pub async fn create_marker_handler(
    State(app_state): State<Arc<AppState>>,
    Json(req): Json<CreateMarkerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let category = parse_category(&req.category)?;
    let marker = app_state
        .markers
        .create(&req.name, req.latitude, req.longitude, category, req.notes.as_deref())
        .await
        .map_err(|e| port_error("Failed to create marker", e))?;
    Ok((StatusCode::CREATED, Json(MarkerResponse::from(marker))))
}

#[utoipa::path(
    get,
    path = "/markers/{id}",
    params(("id" = Uuid, Path, description = "Marker id")),
    responses(
        (status = 200, description = "The marker", body = MarkerResponse),
        (status = 404, description = "Unknown marker")
    )
)]
pub async fn get_marker_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let marker = app_state
        .markers
        .get(id)
        .await
        .map_err(|e| port_error("Failed to load marker", e))?;
    Ok(Json(MarkerResponse::from(marker)))
}

/// Edit a marker. A synced marker goes back to PENDING.
#[utoipa::path(
    patch,
    path = "/markers/{id}",
    params(("id" = Uuid, Path, description = "Marker id")),
    request_body = UpdateMarkerRequest,
    responses(
        (status = 200, description = "The edited marker", body = MarkerResponse),
        (status = 400, description = "Blank name or unknown category"),
        (status = 404, description = "Unknown marker")
    )
)]
pub async fn update_marker_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMarkerRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let update = MarkerUpdate {
        name: req.name,
        category: req.category.as_deref().map(parse_category).transpose()?,
        notes: req.notes.map(Some),
    };
    let marker = app_state
        .markers
        .update(id, update)
        .await
        .map_err(|e| port_error("Failed to update marker", e))?;
    Ok(Json(MarkerResponse::from(marker)))
}

#[utoipa::path(
    delete,
    path = "/markers/{id}",
    params(("id" = Uuid, Path, description = "Marker id")),
    responses(
        (status = 204, description = "Marker deleted"),
        (status = 404, description = "Unknown marker")
    )
)]
pub async fn delete_marker_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .markers
        .delete(id)
        .await
        .map_err(|e| port_error("Failed to delete marker", e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Markers within a radius of a point, nearest first.
#[utoipa::path(
    get,
    path = "/markers/near",
    params(NearParams),
    responses(
        (status = 200, description = "Markers inside the radius", body = [MarkerResponse]),
        (status = 400, description = "Unknown category or negative radius")
    )
)]
pub async fn near_markers_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<NearParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let radius_km = params.radius_km.unwrap_or(DEFAULT_VISIBILITY_RADIUS_KM);
    if !(radius_km >= 0.0) {
        return Err((StatusCode::BAD_REQUEST, "radius_km must not be negative".to_string()));
    }
    let categories = parse_categories(params.category.as_deref())?;
    let mut markers = app_state
        .markers
        .list_near(params.lat, params.lon, radius_km, &categories)
        .await
        .map_err(|e| port_error("Failed to list nearby markers", e))?;

    let center = salbabida_core::Coordinates::new(params.lat, params.lon);
    markers.sort_by(|a, b| {
        center
            .distance_to(&a.coordinates())
            .total_cmp(&center.distance_to(&b.coordinates()))
    });
    Ok(to_responses(markers))
}

/// Delete every marker, synced or not. Admin only.
#[utoipa::path(
    delete,
    path = "/markers",
    responses(
        (status = 204, description = "All markers deleted"),
        (status = 403, description = "The current role is not admin")
    )
)]
pub async fn clear_markers_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .markers
        .clear_all()
        .await
        .map_err(|e| port_error("Failed to clear markers", e))?;
    Ok(StatusCode::NO_CONTENT)
}
