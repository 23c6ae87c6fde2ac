//! services/api/src/web/middleware.rs
//!
//! Role middleware for privileged routes.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{error, warn};

use crate::web::state::AppState;

/// Lets the request through only when the signed-in role is admin.
///
/// The role comes from the local preferences, which sign-in fills from the
/// `users` document. Returns 403 for any other role.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let role = state.preferences.role().await.map_err(|e| {
        error!("Failed to read the current role: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !role.is_admin() {
        warn!("Rejected {} {} for role '{}'", req.method(), req.uri().path(), role);
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}
