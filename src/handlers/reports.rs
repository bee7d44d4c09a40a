//! Read-only reporting endpoints. Each one pulls the relevant rows and
//! hands them to the pure reducers in [`crate::reports`].

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use crate::errors::ServiceError;
use crate::reports::{
    aging_summary, expiry_overview, inventory_metrics, usage_stats, usage_trends, AgingBucket,
    ExpiryRow, TrendPeriod,
};
use crate::{ApiResponse, AppState};

const DEFAULT_TREND_TOP_N: usize = 5;

pub fn reports_router() -> Router<AppState> {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/expiry", get(expiry))
        .route("/usage-stats", get(stats))
        .route("/usage-trends", get(trends))
}

async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.inventory.list(false).await?;
    let today = Utc::now().date_naive();
    Ok(Json(ApiResponse::success(inventory_metrics(&items, today))))
}

#[derive(Debug, Clone, Serialize)]
struct ExpiryReport {
    rows: Vec<ExpiryRow>,
    summary: HashMap<AgingBucket, usize>,
}

async fn expiry(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let items = state.services.inventory.list(false).await?;
    let today = Utc::now().date_naive();
    let report = ExpiryReport {
        rows: expiry_overview(&items, today),
        summary: aging_summary(&items, today),
    };
    Ok(Json(ApiResponse::success(report)))
}

#[derive(Debug, Deserialize)]
struct StatsParams {
    limit: Option<usize>,
}

async fn stats(
    State(state): State<AppState>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state.services.usage.history(params.limit).await?;
    Ok(Json(ApiResponse::success(usage_stats(&entries))))
}

#[derive(Debug, Deserialize)]
struct TrendParams {
    #[serde(default)]
    period: TrendPeriod,
    top_n: Option<usize>,
    limit: Option<usize>,
}

async fn trends(
    State(state): State<AppState>,
    Query(params): Query<TrendParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state.services.usage.history(params.limit).await?;
    let points = usage_trends(
        &entries,
        params.period,
        params.top_n.unwrap_or(DEFAULT_TREND_TOP_N),
    );
    Ok(Json(ApiResponse::success(points)))
}
