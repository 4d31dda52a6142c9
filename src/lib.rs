pub mod config;
pub mod csv_parser;
pub mod dashboard_builder;
pub mod dashboard_service;
pub mod error;
pub mod grafana_client;
pub mod handlers;
pub mod layout;
pub mod models;
pub mod panel_builder;
pub mod query_macros;
pub mod style;
pub mod validator;
pub mod visualization;

use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use dashboard_service::DashboardService;

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service: DashboardService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/dashboard/upload", post(handlers::upload::upload_csv))
        .route("/api/dashboard/validate", post(handlers::upload::validate_csv))
        // Health
        .route("/healthz", get(handlers::health::healthz))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
