//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of the
//! local storage ports from the `core` crate. It handles all interactions with
//! the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use salbabida_core::domain::{HomeLocation, Marker, SyncStatus, WeatherSnapshot};
use salbabida_core::ports::{
    HomeLocationDatabase, MarkerDatabase, PortError, PortResult, PreferenceDatabase,
    WeatherDatabase,
};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every local storage port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct MarkerRecord {
    id: Uuid,
    name: String,
    latitude: f64,
    longitude: f64,
    category: String,
    notes: Option<String>,
    sync_status: String,
    created_at: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
    remote_id: Option<String>,
    remote_doc_id: Option<String>,
    revision: i64,
}
impl MarkerRecord {
    fn to_domain(self) -> PortResult<Marker> {
        let category = self.category.parse().map_err(|_| {
            PortError::Unexpected(format!("Unknown marker category '{}'", self.category))
        })?;
        let sync_status = self.sync_status.parse().map_err(|_| {
            PortError::Unexpected(format!("Unknown sync status '{}'", self.sync_status))
        })?;
        Ok(Marker {
            id: self.id,
            name: self.name,
            latitude: self.latitude,
            longitude: self.longitude,
            category,
            notes: self.notes,
            sync_status,
            created_at: self.created_at,
            synced_at: self.synced_at,
            remote_id: self.remote_id,
            remote_doc_id: self.remote_doc_id,
            revision: self.revision,
        })
    }
}

#[derive(FromRow)]
struct WeatherRecord {
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
}
impl WeatherRecord {
    fn to_domain(self) -> WeatherSnapshot {
        WeatherSnapshot {
            location_key: self.location_key,
            location_name: self.location_name,
            temperature: self.temperature,
            feels_like: self.feels_like,
            humidity: self.humidity,
            pressure: self.pressure,
            visibility: self.visibility,
            wind_speed: self.wind_speed,
            wind_direction: self.wind_direction,
            wind_gust: self.wind_gust,
            cloudiness: self.cloudiness,
            country_code: self.country_code,
            description: self.description,
            icon_id: self.icon_id,
            fetched_at: self.fetched_at,
        }
    }
}

#[derive(FromRow)]
struct HomeLocationRecord {
    id: Uuid,
    latitude: f64,
    longitude: f64,
    is_house: bool,
    name: String,
    created_at: DateTime<Utc>,
}
impl HomeLocationRecord {
    fn to_domain(self) -> HomeLocation {
        HomeLocation {
            id: self.id,
            latitude: self.latitude,
            longitude: self.longitude,
            is_house: self.is_house,
            name: self.name,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct PreferenceRecord {
    key: String,
    value: String,
}

const MARKER_COLUMNS: &str = "id, name, latitude, longitude, category, notes, sync_status, created_at, synced_at, remote_id, remote_doc_id, revision";

//=========================================================================================
// `MarkerDatabase` Trait Implementation
//=========================================================================================

#[async_trait]
impl MarkerDatabase for DbAdapter {
    async fn insert_marker(&self, marker: &Marker) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO markers (id, name, latitude, longitude, category, notes, sync_status, created_at, synced_at, remote_id, remote_doc_id, revision)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(marker.id)
        .bind(&marker.name)
        .bind(marker.latitude)
        .bind(marker.longitude)
        .bind(marker.category.as_ref())
        .bind(&marker.notes)
        .bind(marker.sync_status.as_ref())
        .bind(marker.created_at)
        .bind(marker.synced_at)
        .bind(&marker.remote_id)
        .bind(&marker.remote_doc_id)
        .bind(marker.revision)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_marker(&self, id: Uuid) -> PortResult<Option<Marker>> {
        let record = sqlx::query_as::<_, MarkerRecord>(&format!(
            "SELECT {MARKER_COLUMNS} FROM markers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        record.map(MarkerRecord::to_domain).transpose()
    }

    async fn update_marker(&self, marker: &Marker) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE markers
             SET name = ?, category = ?, notes = ?, sync_status = ?, synced_at = ?, remote_id = ?,
                 revision = revision + 1
             WHERE id = ?",
        )
        .bind(&marker.name)
        .bind(marker.category.as_ref())
        .bind(&marker.notes)
        .bind(marker.sync_status.as_ref())
        .bind(marker.synced_at)
        .bind(&marker.remote_id)
        .bind(marker.id)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Marker {} not found", marker.id)));
        }
        Ok(())
    }

    async fn mark_synced(
        &self,
        id: Uuid,
        revision: i64,
        synced_at: DateTime<Utc>,
        remote_id: &str,
    ) -> PortResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let known = sqlx::query("UPDATE markers SET remote_doc_id = ? WHERE id = ?")
            .bind(remote_id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if known.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Marker {} not found", id)));
        }

        let synced = sqlx::query(
            "UPDATE markers SET sync_status = ?, synced_at = ?, remote_id = ? WHERE id = ? AND revision = ?",
        )
        .bind(SyncStatus::Synced.as_ref())
        .bind(synced_at)
        .bind(remote_id)
        .bind(id)
        .bind(revision)
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(synced.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid) -> PortResult<()> {
        let result = sqlx::query("UPDATE markers SET sync_status = ? WHERE id = ?")
            .bind(SyncStatus::Failed.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Marker {} not found", id)));
        }
        Ok(())
    }

    async fn delete_marker(&self, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM markers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_markers(&self) -> PortResult<Vec<Marker>> {
        let records = sqlx::query_as::<_, MarkerRecord>(&format!(
            "SELECT {MARKER_COLUMNS} FROM markers ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        records.into_iter().map(MarkerRecord::to_domain).collect()
    }

    async fn list_markers_by_status(&self, status: SyncStatus) -> PortResult<Vec<Marker>> {
        let records = sqlx::query_as::<_, MarkerRecord>(&format!(
            "SELECT {MARKER_COLUMNS} FROM markers WHERE sync_status = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(status.as_ref())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        records.into_iter().map(MarkerRecord::to_domain).collect()
    }

    async fn clear_markers(&self) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM markers")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

//=========================================================================================
// `WeatherDatabase` Trait Implementation
//=========================================================================================

#[async_trait]
impl WeatherDatabase for DbAdapter {
    async fn get_snapshot(&self, location_key: &str) -> PortResult<Option<WeatherSnapshot>> {
        let record = sqlx::query_as::<_, WeatherRecord>(
            "SELECT location_key, location_name, temperature, feels_like, humidity, pressure, visibility,
                    wind_speed, wind_direction, wind_gust, cloudiness, country_code, description, icon_id, fetched_at
             FROM weather_snapshots WHERE location_key = ?",
        )
        .bind(location_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(WeatherRecord::to_domain))
    }

    async fn upsert_snapshot(&self, snapshot: &WeatherSnapshot) -> PortResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO weather_snapshots
                (location_key, location_name, temperature, feels_like, humidity, pressure, visibility,
                 wind_speed, wind_direction, wind_gust, cloudiness, country_code, description, icon_id, fetched_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&snapshot.location_key)
        .bind(&snapshot.location_name)
        .bind(snapshot.temperature)
        .bind(snapshot.feels_like)
        .bind(snapshot.humidity)
        .bind(snapshot.pressure)
        .bind(snapshot.visibility)
        .bind(snapshot.wind_speed)
        .bind(snapshot.wind_direction)
        .bind(snapshot.wind_gust)
        .bind(snapshot.cloudiness)
        .bind(&snapshot.country_code)
        .bind(&snapshot.description)
        .bind(&snapshot.icon_id)
        .bind(snapshot.fetched_at)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn clear_snapshots(&self) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM weather_snapshots")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(result.rows_affected())
    }
}

//=========================================================================================
// `HomeLocationDatabase` Trait Implementation
//=========================================================================================

#[async_trait]
impl HomeLocationDatabase for DbAdapter {
    async fn get_home_location(&self) -> PortResult<Option<HomeLocation>> {
        let record = sqlx::query_as::<_, HomeLocationRecord>(
            "SELECT id, latitude, longitude, is_house, name, created_at FROM home_location LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(record.map(HomeLocationRecord::to_domain))
    }

    async fn replace_home_location(&self, home: &HomeLocation) -> PortResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query("DELETE FROM home_location")
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        sqlx::query(
            "INSERT INTO home_location (id, latitude, longitude, is_house, name, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(home.id)
        .bind(home.latitude)
        .bind(home.longitude)
        .bind(home.is_house)
        .bind(&home.name)
        .bind(home.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn delete_home_location(&self) -> PortResult<()> {
        sqlx::query("DELETE FROM home_location")
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}

//=========================================================================================
// `PreferenceDatabase` Trait Implementation
//=========================================================================================

#[async_trait]
impl PreferenceDatabase for DbAdapter {
    async fn load_preferences(&self) -> PortResult<HashMap<String, String>> {
        let records = sqlx::query_as::<_, PreferenceRecord>("SELECT key, value FROM preferences")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(records.into_iter().map(|r| (r.key, r.value)).collect())
    }

    async fn write_preferences(&self, entries: &[(&str, Option<String>)]) -> PortResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        for (key, value) in entries {
            let query = match value {
                Some(value) => sqlx::query(
                    "INSERT INTO preferences (key, value) VALUES (?, ?)
                     ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                )
                .bind(*key)
                .bind(value.as_str()),
                None => sqlx::query("DELETE FROM preferences WHERE key = ?").bind(*key),
            };
            query
                .execute(&mut *tx)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
