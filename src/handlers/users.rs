use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::errors::ServiceError;
use crate::handlers::common::Actor;
use crate::models::{ClientContext, NewUser, UserPatch};
use crate::{ApiResponse, AppState};

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:username", get(get_user).put(update_user).delete(delete_user))
}

async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let profiles = state.services.users.list().await?;
    Ok(Json(ApiResponse::success(profiles)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let profiles = state.services.users.list().await?;
    let profile = profiles
        .into_iter()
        .find(|p| p.username == username)
        .ok_or_else(|| ServiceError::NotFound(format!("user {}", username)))?;
    Ok(Json(ApiResponse::success(profile)))
}

async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    client: ClientContext,
    Json(new_user): Json<NewUser>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor.required()?;
    let profile = state
        .services
        .users
        .create(new_user, &actor, &client)
        .await?;
    Ok(Json(ApiResponse::with_message(
        profile,
        "User created".to_string(),
    )))
}

async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    actor: Actor,
    client: ClientContext,
    Json(patch): Json<UserPatch>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor.required()?;
    let updated = state
        .services
        .users
        .update(&username, patch, &actor, &client)
        .await?;
    Ok(Json(ApiResponse::with_message(
        updated,
        "User updated".to_string(),
    )))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    actor: Actor,
    client: ClientContext,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor.required()?;
    state
        .services
        .users
        .delete(&username, &actor, &client)
        .await?;
    Ok(Json(ApiResponse::with_message(
        (),
        format!("User {} deleted", username),
    )))
}
