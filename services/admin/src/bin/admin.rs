//! services/admin/src/bin/admin.rs

use admin_lib::{
    adapters::{HttpNotifier, HttpSurveyBackend, JsonFileStore},
    config::Config,
    error::ApiError,
    web::{router, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use feedback_core::ports::KeyValueStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Open Local Storage ---
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(&config.store_path));

    // --- 3. Initialize Service Adapters ---
    let backend = Arc::new(HttpSurveyBackend::new(
        &config.api_base_url,
        config.request_timeout,
        store.clone(),
    )?);
    let notifier = Arc::new(HttpNotifier::new(
        &config.notify_url,
        config.request_timeout,
        store.clone(),
    )?);
    info!(
        backend = %config.api_base_url,
        notify = %config.notify_url,
        "Backend adapters ready"
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), store, backend, notifier));

    // --- 5. Create the Web Router ---
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    let app = router(app_state).layer(cors);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
            shutdown.cancel();
        }
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
