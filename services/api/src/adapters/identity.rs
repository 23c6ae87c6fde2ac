//! services/api/src/adapters/identity.rs
//!
//! Email/password identity provider over HTTP.

use async_trait::async_trait;
use reqwest::StatusCode;
use salbabida_core::ports::{IdentityService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub struct HttpIdentityAdapter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct IdentityResponse {
    user_id: String,
}

#[derive(Serialize)]
struct SignOutRequest<'a> {
    user_id: &'a str,
}

impl HttpIdentityAdapter {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn authenticate(&self, path: &str, email: &str, password: &str) -> PortResult<String> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(&Credentials { email, password })
            .send()
            .await
            .map_err(|e| {
                error!("Identity request {} failed: {}", path, e);
                PortError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Identity provider answered {} on {}: {}", status, path, body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    PortError::Unauthorized("Invalid email or password".to_string())
                }
                StatusCode::CONFLICT => {
                    PortError::Validation("An account with this email already exists".to_string())
                }
                StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                    PortError::Validation(body)
                }
                _ => PortError::Network(format!("Identity provider returned {}", status)),
            });
        }

        let identity: IdentityResponse = response
            .json()
            .await
            .map_err(|e| PortError::Network(format!("Malformed identity response: {}", e)))?;
        Ok(identity.user_id)
    }
}

#[async_trait]
impl IdentityService for HttpIdentityAdapter {
    async fn sign_up(&self, email: &str, password: &str) -> PortResult<String> {
        self.authenticate("auth/signup", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortResult<String> {
        self.authenticate("auth/signin", email, password).await
    }

    async fn sign_out(&self, user_id: &str) -> PortResult<()> {
        let response = self
            .client
            .post(format!("{}/auth/signout", self.base_url))
            .json(&SignOutRequest { user_id })
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PortError::Network(format!(
                "Identity provider returned {} on sign-out",
                response.status()
            )));
        }
        Ok(())
    }
}
