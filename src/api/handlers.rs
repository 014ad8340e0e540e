//! REST API handlers for shipment risk analysis
//!
//! These handlers use the shared AnalysisService.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::service::{AnalysisService, DelayQuery, ModelInfo};
use crate::advisory::SuggestedEnvironment;
use crate::delay::DelayEstimate;
use crate::engine::ShipmentAnalysis;
use crate::error::EngineError;
use crate::models::ShipmentRequest;
use crate::routes::RouteProfile;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub shipment: ShipmentRequest,
    /// Defaults to the time of the request
    pub departure: Option<NaiveDateTime>,
}

#[derive(Deserialize)]
pub struct EnvironmentQuery {
    pub route_risk: f64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: EngineError) -> ApiError {
    let status = match e {
        EngineError::Schema { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!("analysis failed: {}", e);
    }
    (
        status,
        Json(ErrorResponse {
            field: e.field().map(str::to_string),
            error: e.to_string(),
        }),
    )
}

/// Malformed or incomplete JSON bodies are schema errors like any other.
/// serde names the offending field in backticks; fall back to `body`.
fn body_error(rejection: JsonRejection) -> ApiError {
    let text = rejection.body_text();
    let field = text
        .split('`')
        .nth(1)
        .filter(|f| !f.is_empty() && !f.contains(char::is_whitespace))
        .unwrap_or("body")
        .to_string();
    error_response(EngineError::schema(field, text))
}

// ============================================================================
// Handlers
// ============================================================================

pub type AppState = Arc<AnalysisService>;

/// GET /api/v1/health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/v1/model
pub async fn get_model(State(service): State<AppState>) -> Json<ModelInfo> {
    Json(service.model_info())
}

/// GET /api/v1/routes/profiles
pub async fn get_route_profiles(State(service): State<AppState>) -> Json<Vec<RouteProfile>> {
    Json(service.route_profiles())
}

/// POST /api/v1/analyze
pub async fn analyze(
    State(service): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<ShipmentAnalysis>, ApiError> {
    let Json(body) = payload.map_err(body_error)?;
    service
        .analyze(&body.shipment, body.departure)
        .map(Json)
        .map_err(error_response)
}

/// POST /api/v1/delay/estimate
pub async fn estimate_delay(
    State(service): State<AppState>,
    payload: Result<Json<DelayQuery>, JsonRejection>,
) -> Result<Json<DelayEstimate>, ApiError> {
    let Json(query) = payload.map_err(body_error)?;
    service.estimate_delay(&query).map(Json).map_err(error_response)
}

/// GET /api/v1/environment/suggest?route_risk=X
pub async fn suggest_environment(
    State(service): State<AppState>,
    Query(params): Query<EnvironmentQuery>,
) -> Result<Json<SuggestedEnvironment>, ApiError> {
    service
        .suggest_environment(params.route_risk)
        .map(Json)
        .map_err(error_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_rest_router;
    use crate::engine::tests::constant_engine;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(risk: f64) -> Router {
        create_rest_router(Arc::new(AnalysisService::new(constant_engine(risk))))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn shipment() -> Value {
        json!({
            "shipment_distance_km": 8500.0,
            "route_risk_score": 0.4,
            "total_ports": 6,
            "ports_crossed": 3,
            "port_congestion": 0.6,
            "sea_traffic_index": 0.5,
            "weather_severity": 3,
            "shipment_priority": 1,
            "ship_type": "Container Ship",
            "product_category": "Electronics",
            "origin_port": "Mumbai Port",
            "destination_port": "Rotterdam"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(42.0), Request::get("/api/v1/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_model_and_profiles() {
        let (status, body) = send(app(42.0), Request::get("/api/v1/model").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], "test");
        assert_eq!(body["tree_count"], 1);

        let (status, body) =
            send(app(42.0), Request::get("/api/v1/routes/profiles").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Primary", "Safer", "Faster"]);
    }

    #[tokio::test]
    async fn test_analyze() {
        let request = post_json(
            "/api/v1/analyze",
            json!({"shipment": shipment(), "departure": "2026-03-01T08:00:00"}),
        );
        let (status, body) = send(app(42.0), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["risk_pct"], 42.0);
        assert_eq!(body["tier"], "suspicious");
        assert_eq!(body["routes"][1]["risk_pct"], 29.4);
        assert_eq!(body["ranking"]["cheapest"], "Faster");
    }

    #[tokio::test]
    async fn test_analyze_out_of_range_is_422() {
        let mut shipment = shipment();
        shipment["weather_severity"] = json!(5);
        shipment["sea_traffic_index"] = json!(2.5);
        let (status, body) = send(app(42.0), post_json("/api/v1/analyze", json!({ "shipment": shipment }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "sea_traffic_index");
    }

    #[tokio::test]
    async fn test_incomplete_body_uses_error_shape() {
        let mut shipment = shipment();
        shipment.as_object_mut().unwrap().remove("shipment_priority");
        let (status, body) = send(app(42.0), post_json("/api/v1/analyze", json!({ "shipment": shipment }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("shipment_priority"));
        assert_eq!(body["field"], "shipment_priority");

        let query = json!({"risk_pct": "high", "weather_severity": 2, "port_congestion": 0.1, "sea_traffic_index": 0.1});
        let (status, body) = send(app(42.0), post_json("/api/v1/delay/estimate", query)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let request = Request::post("/api/v1/delay/estimate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(42.0), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "body");
    }

    #[tokio::test]
    async fn test_delay_estimate() {
        let query = json!({
            "risk_pct": 70.0,
            "weather_severity": 4,
            "port_congestion": 0.75,
            "sea_traffic_index": 0.85
        });
        let (status, body) = send(app(42.0), post_json("/api/v1/delay/estimate", query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"], 6);
        assert_eq!(body["probability"], 99.9);
    }

    #[tokio::test]
    async fn test_suggest_environment() {
        let uri = "/api/v1/environment/suggest?route_risk=0.7";
        let (status, body) = send(app(42.0), Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["weather_severity"], 4);
        assert_eq!(body["port_congestion"], 0.9);

        let uri = "/api/v1/environment/suggest?route_risk=1.5";
        let (status, body) = send(app(42.0), Request::get(uri).body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "route_risk");
    }
}
