//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol used to push store changes to
//! connected clients.

use salbabida_core::{MarkerChange, Preferences};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::web::settings::PreferencesResponse;

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Liveness check; answered with `pong`.
    Ping,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    MarkerCreated { id: Uuid },
    MarkerUpdated { id: Uuid },
    MarkerDeleted { id: Uuid },

    /// A marker moved between PENDING, SYNCED and FAILED.
    MarkerSyncStatus { id: Uuid, status: String },

    /// Every marker was removed at once.
    MarkersCleared,

    /// Carries the full settings snapshot after any change.
    PreferencesChanged { preferences: PreferencesResponse },

    Pong,

    /// Reports a problem with something the client sent.
    Error { message: String },
}

impl From<MarkerChange> for ServerMessage {
    fn from(change: MarkerChange) -> Self {
        match change {
            MarkerChange::Created(id) => ServerMessage::MarkerCreated { id },
            MarkerChange::Updated(id) => ServerMessage::MarkerUpdated { id },
            MarkerChange::Deleted(id) => ServerMessage::MarkerDeleted { id },
            MarkerChange::SyncStatusChanged { id, status } => ServerMessage::MarkerSyncStatus {
                id,
                status: status.to_string(),
            },
            MarkerChange::Cleared => ServerMessage::MarkersCleared,
        }
    }
}

impl From<Preferences> for ServerMessage {
    fn from(preferences: Preferences) -> Self {
        ServerMessage::PreferencesChanged {
            preferences: PreferencesResponse::from(preferences),
        }
    }
}
