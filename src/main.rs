mod app_state;
mod config;
mod db;
mod models;
mod routes;
mod services;

use axum::routing::{get, patch, post, put};
use axum::Router;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use app_state::AppState;
use config::AppConfig;
use services::{auth::JwtKeys, feed::ChangeFeed, positions::PositionHub, storage::StorageClient};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing fieldlink server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("links_issued_total", "Total client links issued");
    metrics::describe_counter!(
        "gate_checks_total",
        "Access gate decisions, labelled by outcome"
    );
    metrics::describe_counter!(
        "diag_photos_uploaded_total",
        "Diagnostic photos stored successfully"
    );
    metrics::describe_counter!(
        "diag_photos_failed_total",
        "Diagnostic photo uploads abandoned after retries"
    );
    metrics::describe_counter!("change_events_total", "Change events broadcast to dashboards");
    metrics::describe_counter!("position_updates_total", "Position reports published");

    // Initialize database connection pool
    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run database migrations
    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // Initialize photo storage client
    tracing::info!("Initializing photo storage client");
    let storage = StorageClient::new(
        &config.storage_bucket,
        &config.storage_endpoint,
        &config.storage_access_key,
        &config.storage_secret_key,
        &config.storage_public_url,
    )
    .expect("Failed to initialize storage client");

    // Create shared application state
    let state = AppState::new(
        db_pool,
        storage,
        ChangeFeed::default(),
        PositionHub::default(),
        JwtKeys::new(&config.jwt_secret),
        &config.public_base_url,
    );

    // Build API routes
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Professional-facing API (bearer auth)
        .route("/api/v1/links", post(routes::links::issue_link))
        .route("/api/v1/interventions", get(routes::interventions::list))
        .route(
            "/api/v1/interventions/export",
            get(routes::interventions::export_csv),
        )
        .route(
            "/api/v1/interventions/{id}/status",
            patch(routes::interventions::set_status),
        )
        .route(
            "/api/v1/interventions/{id}/position",
            put(routes::interventions::publish_position),
        )
        .route("/api/v1/events", get(routes::events::change_feed))
        .route(
            "/api/v1/invoices",
            post(routes::invoices::create).get(routes::invoices::list),
        )
        .route(
            "/api/v1/invoices/{id}",
            get(routes::invoices::get).delete(routes::invoices::delete),
        )
        .route("/api/v1/invoices/{id}/sign", post(routes::invoices::sign))
        .route(
            "/api/v1/invoices/{id}/convert",
            post(routes::invoices::convert),
        )
        .route(
            "/api/v1/invoices/{id}/paid",
            post(routes::invoices::mark_paid),
        )
        .route(
            "/api/v1/notifications",
            get(routes::notifications::list),
        )
        .route(
            "/api/v1/notifications/{id}/read",
            post(routes::notifications::mark_read),
        )
        // Anonymous client-facing API (capability token in the path)
        .route("/api/v1/track/{token}", get(routes::access::track_access))
        .route(
            "/api/v1/track/{token}/positions",
            get(routes::access::track_positions),
        )
        .route("/api/v1/diag/{token}", get(routes::access::diag_access))
        .route(
            "/api/v1/diag/{token}/photos",
            post(routes::intake::submit_photos),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::health::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(15 * 1024 * 1024)); // 3 photos + headroom

    tracing::info!("Starting fieldlink on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
