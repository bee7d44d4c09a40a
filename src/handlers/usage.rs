use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::handlers::common::Actor;
use crate::models::{ClientContext, NewUsageLog};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

pub fn usage_router() -> Router<AppState> {
    Router::new().route("/", get(usage_history).post(log_usage))
}

async fn log_usage(
    State(state): State<AppState>,
    actor: Actor,
    client: ClientContext,
    Json(new_log): Json<NewUsageLog>,
) -> Result<impl IntoResponse, ServiceError> {
    let receipt = state
        .services
        .usage
        .log_usage(new_log, actor.context(), &client)
        .await?;
    let message = if receipt.inventory_updated {
        "Usage logged successfully"
    } else {
        "Usage logged; inventory could not be updated"
    };
    Ok(Json(ApiResponse::with_message(receipt, message)))
}

async fn usage_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state.services.usage.history(params.limit).await?;
    Ok(Json(ApiResponse::success(entries)))
}
