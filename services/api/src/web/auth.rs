//! services/api/src/web/auth.rs
//!
//! Account endpoints: signup, signin, signout and address changes. The
//! identity provider checks the credentials; these handlers only translate
//! requests for the account service.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use salbabida_core::{Address, Coordinates, Session, SignUpRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::web::{rest::port_error, state::AppState};

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Either a GPS fix (`latitude` and `longitude`) or all three address
/// fields must be given.
#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub barangay: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
}

impl SignupRequest {
    fn into_core(self) -> SignUpRequest {
        let gps_fix = match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::new(latitude, longitude)),
            _ => None,
        };
        let address = if self.barangay.is_some() || self.city.is_some() || self.province.is_some() {
            Some(Address {
                barangay: self.barangay.unwrap_or_default(),
                city: self.city.unwrap_or_default(),
                province: self.province.unwrap_or_default(),
            })
        } else {
            None
        };
        SignUpRequest {
            name: self.name,
            email: self.email,
            password: self.password,
            confirm_password: self.confirm_password,
            gps_fix,
            address,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: String,
    /// `user` or `admin`.
    pub role: String,
}

impl From<Session> for AuthResponse {
    fn from(session: Session) -> Self {
        Self {
            user_id: session.user_id,
            role: session.role.to_string(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AddressRequest {
    pub barangay: String,
    pub city: String,
    pub province: String,
}

/// Coordinates the geocoder found for the new address, if any.
#[derive(Serialize, ToSchema)]
pub struct AddressResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create an account and start a session
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid fields or unresolvable address"),
        (status = 502, description = "Identity provider unavailable")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .accounts
        .sign_up(req.into_core())
        .await
        .map_err(|e| port_error("Failed to sign up", e))?;

    Ok((StatusCode::CREATED, Json(AuthResponse::from(session))))
}

/// POST /auth/signin - Sign in with an existing account
#[utoipa::path(
    post,
    path = "/auth/signin",
    request_body = SigninRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Missing email or password"),
        (status = 403, description = "Invalid credentials")
    )
)]
pub async fn signin_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SigninRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .accounts
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| port_error("Failed to sign in", e))?;

    Ok(Json(AuthResponse::from(session)))
}

/// POST /auth/signout - End the current session
#[utoipa::path(
    post,
    path = "/auth/signout",
    responses((status = 204, description = "Signed out"))
)]
pub async fn signout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .accounts
        .sign_out()
        .await
        .map_err(|e| port_error("Failed to sign out", e))?;

    info!("Session cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /account/address - Change the stored home address
#[utoipa::path(
    put,
    path = "/account/address",
    request_body = AddressRequest,
    responses(
        (status = 200, description = "Address stored", body = AddressResponse),
        (status = 400, description = "Empty address")
    )
)]
pub async fn update_address_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddressRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let address = Address {
        barangay: req.barangay,
        city: req.city,
        province: req.province,
    };
    let found = state
        .accounts
        .update_address(address)
        .await
        .map_err(|e| port_error("Failed to update the address", e))?;

    Ok(Json(AddressResponse {
        latitude: found.map(|c| c.latitude),
        longitude: found.map(|c| c.longitude),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SignupRequest {
        SignupRequest {
            name: "Juan".to_string(),
            email: "juan@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            latitude: None,
            longitude: None,
            barangay: None,
            city: None,
            province: None,
        }
    }

    #[test]
    fn gps_fix_needs_both_halves() {
        let mut req = request();
        req.latitude = Some(13.1);
        assert!(req.into_core().gps_fix.is_none());

        let mut req = request();
        req.latitude = Some(13.1);
        req.longitude = Some(123.7);
        assert_eq!(req.into_core().gps_fix, Some(Coordinates::new(13.1, 123.7)));
    }

    #[test]
    fn partial_address_is_passed_on_for_validation() {
        let mut req = request();
        req.city = Some("Legazpi".to_string());
        let address = req.into_core().address.unwrap();
        assert_eq!(address.city, "Legazpi");
        assert!(address.barangay.is_empty());
    }
}
