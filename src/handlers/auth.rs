use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::errors::ServiceError;
use crate::handlers::common::Actor;
use crate::models::{ClientContext, PasswordChange};
use crate::{ApiResponse, AppState};

pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
}

// No Debug derive: the plaintext password must never reach a log line.
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

async fn login(
    State(state): State<AppState>,
    client: ClientContext,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
    match state
        .services
        .users
        .authenticate(&request.username, &request.password, &client)
        .await?
    {
        Some(profile) => Ok(Json(ApiResponse::with_message(
            profile,
            "Login successful".to_string(),
        ))),
        None => Err(ServiceError::AuthError(
            "Invalid username or password".to_string(),
        )),
    }
}

async fn change_password(
    State(state): State<AppState>,
    actor: Actor,
    client: ClientContext,
    Json(change): Json<PasswordChange>,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor.required()?;
    state
        .services
        .users
        .change_password(change, &actor, &client)
        .await?;
    Ok(Json(ApiResponse::with_message(
        (),
        "Password changed".to_string(),
    )))
}

async fn logout(
    State(state): State<AppState>,
    actor: Actor,
    client: ClientContext,
) -> Result<impl IntoResponse, ServiceError> {
    let actor = actor.required()?;
    state.services.users.logout(&actor, &client).await;
    Ok(Json(ApiResponse::with_message(
        (),
        "Logged out".to_string(),
    )))
}
