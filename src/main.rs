//! Wellstock Server - Oilfield Equipment Tracking
//!
//! REST API server for tracking surface equipment across storage locations
//! and field jobs.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wellstock_server::{
    api, config::AppConfig, repository::Repository, services::Services, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "wellstock_server={},tower_http=debug",
            config.logging.level
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Wellstock Server v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Save server address before moving config
    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    // Create repository and services
    let repository = Repository::new(pool.clone());
    let services = Services::new(repository.clone(), &config.allocation);

    // Seed the allocation ledger and catalog cache from persisted state
    let jobs = repository.jobs.list().await.expect("Failed to load jobs");
    let job_names: HashMap<i32, String> = jobs.into_iter().map(|j| (j.id, j.name)).collect();
    services
        .allocation
        .load_catalog(&job_names)
        .await
        .expect("Failed to load equipment catalog");

    // Start the realtime change feed listener
    services
        .realtime
        .start(pool, Arc::clone(&services.allocation));

    // Create application state
    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };
    let services = Arc::clone(&state.services);

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(
        server_host.parse().expect("Invalid host address"),
        server_port,
    );

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    services.realtime.shutdown();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Equipment types
        .route("/equipment-types", get(api::equipment_types::list_types))
        .route("/equipment-types", post(api::equipment_types::create_type))
        .route("/equipment-types/:id", get(api::equipment_types::get_type))
        .route("/equipment-types/:id", put(api::equipment_types::update_type))
        .route("/equipment-types/:id", delete(api::equipment_types::delete_type))
        .route("/equipment-types/:id/next-id", get(api::equipment_types::next_id))
        // Storage locations
        .route("/locations", get(api::locations::list_locations))
        .route("/locations", post(api::locations::create_location))
        .route("/locations/default", get(api::locations::get_default_location))
        .route("/locations/:id", get(api::locations::get_location))
        .route("/locations/:id", put(api::locations::update_location))
        .route("/locations/:id", delete(api::locations::delete_location))
        .route("/locations/:id/default", put(api::locations::set_default_location))
        // Individual equipment
        .route("/equipment/individual", get(api::equipment::list_individual))
        .route("/equipment/individual", post(api::equipment::create_individual))
        .route("/equipment/individual/:equipment_id", get(api::equipment::get_individual))
        .route("/equipment/individual/:equipment_id", put(api::equipment::update_individual))
        .route("/equipment/individual/:equipment_id", delete(api::equipment::delete_individual))
        .route("/equipment/individual/:equipment_id/red-tag", post(api::equipment::red_tag_individual))
        .route("/equipment/individual/:equipment_id/red-tag", delete(api::equipment::lift_red_tag_individual))
        .route("/equipment/individual/:equipment_id/transfer", post(api::equipment::transfer_individual))
        // Bulk equipment
        .route("/equipment/bulk", get(api::equipment::list_bulk))
        .route("/equipment/bulk", post(api::equipment::create_bulk))
        .route("/equipment/bulk/:id", get(api::equipment::get_bulk))
        .route("/equipment/bulk/:id", put(api::equipment::update_bulk))
        .route("/equipment/bulk/:id", delete(api::equipment::delete_bulk))
        .route("/equipment/bulk/:id/red-tag", post(api::equipment::red_tag_bulk))
        .route("/equipment/bulk/:id/red-tag", delete(api::equipment::lift_red_tag_bulk))
        .route("/equipment/bulk/:id/transfer", post(api::equipment::transfer_bulk))
        .route("/equipment/consolidate", post(api::equipment::consolidate))
        .route("/equipment/:equipment_id/status", get(api::equipment::equipment_status))
        // Jobs
        .route("/jobs", get(api::jobs::list_jobs))
        .route("/jobs", post(api::jobs::create_job))
        .route("/jobs/:id", get(api::jobs::get_job))
        .route("/jobs/:id", put(api::jobs::update_job))
        .route("/jobs/:id", delete(api::jobs::delete_job))
        .route("/jobs/:id/sync-equipment", post(api::jobs::sync_equipment))
        .route("/jobs/:id/allocations", get(api::jobs::job_allocations))
        // Allocations
        .route("/allocations", post(api::allocation::allocate))
        .route("/allocations/validate", post(api::allocation::validate))
        .route("/allocations/release", post(api::allocation::release))
        .route("/allocations/conflicts", get(api::allocation::list_conflicts))
        .route("/allocations/conflicts/:id/resolve", post(api::allocation::resolve_conflict))
        .route("/allocations/resync", post(api::allocation::resync))
        // Realtime feed
        .route("/events/equipment", get(api::events::equipment_events))
        .with_state(state.clone());

    // OpenAPI documentation
    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
