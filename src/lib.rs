//! LabStock API Library
//!
//! Backend for laboratory inventory tracking: stock records, usage
//! logging with automatic deduction, a per-field audit trail, reporting,
//! and admin-gated account management over a pluggable record store.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod reports;
pub mod services;
pub mod store;

use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .nest("/auth", handlers::auth::auth_router())
        .nest("/inventory", handlers::inventory::inventory_router())
        .nest("/usage", handlers::usage::usage_router())
        .nest("/audit", handlers::audit::audit_router())
        .nest("/users", handlers::users::users_router())
        .nest("/reports", handlers::reports::reports_router())
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "labstock-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}
