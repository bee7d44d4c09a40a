use std::{net::SocketAddr, sync::Arc};

use axum::{routing::get, Router};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use labstock_api as api;

use api::store::{InMemoryStore, RecordStore, RestStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Pick the record store backend
    let store: Arc<dyn RecordStore> = if cfg.uses_rest_backend() {
        info!(url = %cfg.store_url, "using REST record store");
        Arc::new(RestStore::new(&cfg.store_url, &cfg.store_api_key)?)
    } else {
        info!("using in-memory record store (data is not persisted)");
        Arc::new(InMemoryStore::new())
    };

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        store,
        cfg.default_reorder_level,
        cfg.decrement_max_retries,
    );

    let app_state = api::AppState {
        config: cfg.clone(),
        services,
    };

    let cors_layer = if cfg.is_development() {
        info!("Using permissive CORS (development environment)");
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    let app = Router::<api::AppState>::new()
        .route("/", get(|| async { "labstock-api up" }))
        .nest("/health", api::handlers::health::health_routes())
        .nest("/api/v1", api::api_v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    info!("labstock-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
