//! services/api/src/adapters/remote_store.rs
//!
//! REST/JSON client for the shared document store. Implements both the
//! `RemoteStoreService` (evacuation centres, pushed markers) and the
//! `UserDirectoryService` (the `users` collection) ports.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use salbabida_core::domain::{Marker, RemoteShelter, UserProfile, UserRole};
use salbabida_core::ports::{PortError, PortResult, RemoteStoreService, UserDirectoryService};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

pub struct RemoteStoreAdapter {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl RemoteStoreAdapter {
    pub fn new(client: reqwest::Client, base_url: String, token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> PortResult<Response> {
        let response = self.authorized(request).send().await.map_err(|e| {
            error!("Remote store request '{}' failed: {}", what, e);
            PortError::Network(e.to_string())
        })?;
        check_status(response, what).await
    }
}

async fn check_status(response: Response, what: &str) -> PortResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("Remote store '{}' answered {}: {}", what, status, body);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PortError::Unauthorized(format!("Remote store refused '{}'", what))
        }
        StatusCode::NOT_FOUND => PortError::NotFound(format!("Remote store has no '{}'", what)),
        _ => PortError::Network(format!("Remote store returned {} for '{}'", status, what)),
    })
}

fn malformed(e: reqwest::Error) -> PortError {
    PortError::Network(format!("Malformed remote store response: {}", e))
}

//=========================================================================================
// Wire format
//=========================================================================================

#[derive(Debug, Deserialize, Serialize)]
struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ShelterDocument {
    id: String,
    #[serde(default)]
    name: String,
    place: Option<GeoPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkerDocument<'a> {
    local_id: String,
    name: &'a str,
    place: GeoPoint,
    category: &'a str,
    notes: Option<&'a str>,
    created_at: i64,
}

#[derive(Debug, Deserialize)]
struct CreatedDocument {
    id: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    role: String,
    barangay: Option<String>,
    city: Option<String>,
    province: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    /// Milliseconds since the epoch.
    #[serde(default)]
    created_at: i64,
}

impl UserDocument {
    fn from_domain(profile: &UserProfile) -> Self {
        Self {
            name: profile.name.clone(),
            email: profile.email.clone(),
            role: profile.role.to_string(),
            barangay: profile.barangay.clone(),
            city: profile.city.clone(),
            province: profile.province.clone(),
            latitude: profile.latitude,
            longitude: profile.longitude,
            created_at: profile.created_at.timestamp_millis(),
        }
    }

    fn to_domain(self) -> UserProfile {
        let created_at: DateTime<Utc> = Utc
            .timestamp_millis_opt(self.created_at)
            .single()
            .unwrap_or_default();
        UserProfile {
            name: self.name,
            email: self.email,
            role: UserRole::from_stored(&self.role),
            barangay: self.barangay,
            city: self.city,
            province: self.province,
            latitude: self.latitude,
            longitude: self.longitude,
            created_at,
        }
    }
}

//=========================================================================================
// `RemoteStoreService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RemoteStoreService for RemoteStoreAdapter {
    async fn list_shelters(&self) -> PortResult<Vec<RemoteShelter>> {
        let response = self
            .send(self.client.get(self.url("evacuation_centers")), "list evacuation_centers")
            .await?;
        let documents: Vec<ShelterDocument> = response.json().await.map_err(malformed)?;

        let total = documents.len();
        let shelters: Vec<RemoteShelter> = documents
            .into_iter()
            .filter_map(|doc| {
                let place = doc.place?;
                Some(RemoteShelter {
                    id: doc.id,
                    name: doc.name,
                    latitude: place.latitude,
                    longitude: place.longitude,
                })
            })
            .collect();
        if shelters.len() < total {
            warn!("Skipped {} evacuation centers without a location", total - shelters.len());
        }
        Ok(shelters)
    }

    async fn delete_shelter(&self, shelter_id: &str) -> PortResult<()> {
        let path = format!("evacuation_centers/{}", shelter_id);
        match self.send(self.client.delete(self.url(&path)), &path).await {
            // Already gone counts as deleted.
            Ok(_) | Err(PortError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn push_marker(&self, marker: &Marker) -> PortResult<String> {
        let document = MarkerDocument {
            local_id: marker.id.to_string(),
            name: &marker.name,
            place: GeoPoint {
                latitude: marker.latitude,
                longitude: marker.longitude,
            },
            category: marker.category.as_ref(),
            notes: marker.notes.as_deref(),
            created_at: marker.created_at.timestamp_millis(),
        };

        if let Some(doc_id) = &marker.remote_doc_id {
            let path = format!("markers/{}", doc_id);
            match self
                .send(self.client.put(self.url(&path)).json(&document), &path)
                .await
            {
                Ok(_) => {
                    info!("Updated remote marker {}", doc_id);
                    return Ok(doc_id.clone());
                }
                Err(PortError::NotFound(_)) => {
                    warn!("Remote marker {} is gone, creating a new document", doc_id);
                }
                Err(e) => return Err(e),
            }
        }

        let response = self
            .send(self.client.post(self.url("markers")).json(&document), "create marker")
            .await?;
        let created: CreatedDocument = response.json().await.map_err(malformed)?;
        info!("Created remote marker {} for {}", created.id, marker.id);
        Ok(created.id)
    }
}

//=========================================================================================
// `UserDirectoryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserDirectoryService for RemoteStoreAdapter {
    async fn get_user(&self, user_id: &str) -> PortResult<Option<UserProfile>> {
        let path = format!("users/{}", user_id);
        let response = match self.send(self.client.get(self.url(&path)), &path).await {
            Ok(response) => response,
            Err(PortError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let document: UserDocument = response.json().await.map_err(malformed)?;
        Ok(Some(document.to_domain()))
    }

    async fn put_user(&self, user_id: &str, profile: &UserProfile) -> PortResult<()> {
        let path = format!("users/{}", user_id);
        self.send(
            self.client
                .put(self.url(&path))
                .json(&UserDocument::from_domain(profile)),
            &path,
        )
        .await?;
        Ok(())
    }
}
