//! API module for shipment risk analysis
//!
//! REST interface over the shared risk engine.

pub mod service;
pub mod handlers;

pub use service::AnalysisService;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn create_rest_router(service: Arc<AnalysisService>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/api/v1/health", get(handlers::health))
        // Model and configuration
        .route("/api/v1/model", get(handlers::get_model))
        .route("/api/v1/routes/profiles", get(handlers::get_route_profiles))
        // Analysis
        .route("/api/v1/analyze", post(handlers::analyze))
        .route("/api/v1/delay/estimate", post(handlers::estimate_delay))
        .route("/api/v1/environment/suggest", get(handlers::suggest_environment))
        // State and middleware
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
