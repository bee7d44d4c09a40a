use axum::{
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::errors::ServiceError;
use crate::services::AuditQuery;
use crate::{ApiResponse, AppState};

pub fn audit_router() -> Router<AppState> {
    Router::new().route("/", get(query_audit))
}

async fn query_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let entries = state.services.audit.query(&query).await?;
    Ok(Json(ApiResponse::success(entries)))
}
