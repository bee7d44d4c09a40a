use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::errors::ServiceError;
use crate::handlers::common::Actor;
use crate::models::{ClientContext, InventoryPatch, NewInventoryItem};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize)]
pub struct DecrementRequest {
    pub amount: i64,
    pub notes: Option<String>,
}

pub fn inventory_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory).post(add_item))
        .route(
            "/:item_id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/:item_id/decrement", post(decrement_item))
}

async fn list_inventory(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let items = state
        .services
        .inventory
        .list(params.include_deleted)
        .await?;
    Ok(Json(ApiResponse::success(items)))
}

async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .inventory
        .get(&item_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("inventory item {}", item_id)))?;
    Ok(Json(ApiResponse::success(item)))
}

async fn add_item(
    State(state): State<AppState>,
    actor: Actor,
    client: ClientContext,
    Json(new_item): Json<NewInventoryItem>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state
        .services
        .inventory
        .add(new_item, actor.context(), &client)
        .await?;
    Ok(Json(ApiResponse::with_message(
        item,
        "Item added successfully",
    )))
}

async fn update_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    actor: Actor,
    client: ClientContext,
    Json(patch): Json<InventoryPatch>,
) -> Result<impl IntoResponse, ServiceError> {
    let changes = state
        .services
        .inventory
        .update(&item_id, patch, actor.context(), &client)
        .await?;
    let message = if changes.is_empty() {
        "No changes"
    } else {
        "Item updated successfully"
    };
    Ok(Json(ApiResponse::with_message(changes, message)))
}

async fn decrement_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    actor: Actor,
    client: ClientContext,
    Json(req): Json<DecrementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let (old_quantity, new_quantity) = state
        .services
        .inventory
        .decrement(&item_id, req.amount, actor.context(), &client, req.notes)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({
        "item_id": item_id,
        "old_quantity": old_quantity,
        "new_quantity": new_quantity,
    }))))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    actor: Actor,
    client: ClientContext,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .inventory
        .delete(&item_id, actor.context(), &client)
        .await?;
    Ok(Json(ApiResponse::with_message((), "Item retired")))
}
