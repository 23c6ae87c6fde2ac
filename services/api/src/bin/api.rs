//! services/api/src/bin/api.rs

use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use salbabida_api::{
    adapters::{
        DbAdapter, HttpIdentityAdapter, NominatimAdapter, OpenWeatherAdapter, RemoteStoreAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        auth::{signin_handler, signout_handler, signup_handler, update_address_handler},
        markers::{
            clear_markers_handler, create_marker_handler, delete_marker_handler,
            get_marker_handler, list_markers_handler, near_markers_handler,
            update_marker_handler,
        },
        require_admin,
        rest::{
            clear_weather_cache_handler, get_city_weather_handler, get_weather_handler,
            list_shelters_handler, nearest_shelter_handler, purge_shelters_handler, sync_handler,
            ApiDoc,
        },
        settings::{
            clear_home_handler, clear_weather_location_handler, get_home_handler,
            get_preferences_handler, list_regions_handler, map_center_handler, set_home_handler,
            set_user_location_handler, set_weather_location_handler, update_preferences_handler,
        },
        state::AppState,
        ws_handler,
    },
};
use salbabida_core::{
    AccountService, Clock, HomeLocationStore, MarkerStore, PreferenceStore, SyncCoordinator,
    SystemClock, WeatherCache, WeatherLookup,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open the Local Database & Run Migrations ---
    info!("Opening local database at {}", config.database_url);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Remote Service Adapters ---
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let weather_adapter = Arc::new(OpenWeatherAdapter::new(
        http_client.clone(),
        config.weather_api_url.clone(),
        config.weather_api_key.clone(),
    ));
    let remote_store = Arc::new(RemoteStoreAdapter::new(
        http_client.clone(),
        config.remote_store_url.clone(),
        config.remote_store_token.clone(),
    ));
    let identity_adapter = Arc::new(HttpIdentityAdapter::new(
        http_client.clone(),
        config.identity_url.clone(),
    ));
    let geocoder = Arc::new(NominatimAdapter::new(
        http_client,
        config.geocoder_url.clone(),
    ));

    // --- 4. Build the Core Stores ---
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let preferences = Arc::new(PreferenceStore::new(db_adapter.clone()));
    let markers = Arc::new(MarkerStore::new(db_adapter.clone(), clock.clone()));
    let weather_cache = Arc::new(WeatherCache::new(db_adapter.clone(), clock.clone()));
    let weather = Arc::new(WeatherLookup::new(
        weather_cache,
        preferences.clone(),
        weather_adapter,
    ));
    let sync = Arc::new(SyncCoordinator::new(markers.clone(), remote_store.clone()));
    let home = Arc::new(HomeLocationStore::new(db_adapter, clock.clone()));
    let accounts = Arc::new(AccountService::new(
        identity_adapter,
        remote_store,
        geocoder,
        preferences.clone(),
        clock,
    ));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        markers,
        weather,
        sync,
        preferences,
        home,
        accounts,
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/signin", post(signin_handler))
        .route("/auth/signout", post(signout_handler))
        .route("/account/address", put(update_address_handler))
        .route("/weather", get(get_weather_handler))
        .route("/weather/city/{name}", get(get_city_weather_handler))
        .route("/weather/cache", delete(clear_weather_cache_handler))
        .route("/markers", get(list_markers_handler).post(create_marker_handler))
        .route("/markers/near", get(near_markers_handler))
        .route(
            "/markers/{id}",
            get(get_marker_handler)
                .patch(update_marker_handler)
                .delete(delete_marker_handler),
        )
        .route("/sync", post(sync_handler))
        .route("/shelters", get(list_shelters_handler))
        .route("/shelters/nearest", get(nearest_shelter_handler))
        .route(
            "/preferences",
            get(get_preferences_handler).patch(update_preferences_handler),
        )
        .route("/preferences/user-location", put(set_user_location_handler))
        .route(
            "/preferences/weather-location",
            put(set_weather_location_handler).delete(clear_weather_location_handler),
        )
        .route(
            "/home",
            get(get_home_handler)
                .put(set_home_handler)
                .delete(clear_home_handler),
        )
        .route("/regions", get(list_regions_handler))
        .route("/map/center", get(map_center_handler))
        .route("/ws", get(ws_handler));

    // Destructive bulk operations need the admin role.
    let admin_routes = Router::new()
        .route("/markers", delete(clear_markers_handler))
        .route("/shelters", delete(purge_shelters_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_admin,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
