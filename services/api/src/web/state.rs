//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use salbabida_core::{
    AccountService, HomeLocationStore, MarkerStore, PreferenceStore, SyncCoordinator,
    WeatherLookup,
};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
/// Every store is constructed exactly once and injected here.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub markers: Arc<MarkerStore>,
    pub weather: Arc<WeatherLookup>,
    pub sync: Arc<SyncCoordinator>,
    pub preferences: Arc<PreferenceStore>,
    pub home: Arc<HomeLocationStore>,
    pub accounts: Arc<AccountService>,
}
