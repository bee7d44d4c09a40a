use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

use crate::store::{collections, Filter, QueryOptions};
use crate::AppState;

/// Liveness probe. Always 200 while the process is up.
async fn liveness_check() -> impl IntoResponse {
    Json(json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness probe. Issues a one-row query against the record store so
/// the check exercises the same path real requests take.
async fn readiness_check(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let start = Instant::now();
    let probe = state
        .services
        .store
        .query(
            collections::INVENTORY,
            &[Filter::eq("item_id", "__health_probe__")],
            &QueryOptions {
                limit: Some(1),
                ..QueryOptions::default()
            },
        )
        .await;
    let latency = start.elapsed().as_millis() as u64;

    match probe {
        Ok(_) => Ok((
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": {
                    "store": { "status": "up", "latency_ms": latency }
                }
            })),
        )),
        Err(err) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "checks": {
                    "store": { "status": "down", "error": err.to_string() }
                }
            })),
        )),
    }
}

/// Endpoints:
/// - GET /health        - liveness (200 while the server is running)
/// - GET /health/ready  - readiness (checks record store connectivity)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
}
