//! crates/salbabida_core/src/home.rs
//!
//! The single saved home (or pinned) location.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::domain::HomeLocation;
use crate::geo::Coordinates;
use crate::ports::{Clock, HomeLocationDatabase, PortError, PortResult};

pub struct HomeLocationStore {
    db: Arc<dyn HomeLocationDatabase>,
    clock: Arc<dyn Clock>,
}

impl HomeLocationStore {
    pub fn new(db: Arc<dyn HomeLocationDatabase>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn get(&self) -> PortResult<Option<HomeLocation>> {
        self.db.get_home_location().await
    }

    /// Replaces the saved location. The previous row is deleted first, never merged.
    pub async fn set(&self, latitude: f64, longitude: f64, is_house: bool) -> PortResult<HomeLocation> {
        if !Coordinates::new(latitude, longitude).is_valid() {
            return Err(PortError::Validation(format!(
                "Coordinates ({}, {}) are outside the valid range",
                latitude, longitude
            )));
        }
        let home = HomeLocation {
            id: Uuid::new_v4(),
            latitude,
            longitude,
            is_house,
            name: if is_house { "My Home" } else { "Saved Location" }.to_string(),
            created_at: self.clock.now(),
        };
        self.db.replace_home_location(&home).await?;
        info!("Saved {} at ({}, {})", home.name, latitude, longitude);
        Ok(home)
    }

    pub async fn clear(&self) -> PortResult<()> {
        self.db.delete_home_location().await
    }
}
