mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Settings;

pub use state::{AppState, StartupError};

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/catalog", get(handlers::catalog))
        .route("/api/zones", get(handlers::zones))
        .route("/api/zone", get(handlers::zone))
        .route("/api/localities", get(handlers::localities))
        .route("/api/geocode", get(handlers::geocode_address))
        .route("/api/quote", axum::routing::post(handlers::quote))
        .route("/api/leads", get(handlers::list_leads).post(handlers::create_lead))
        .route("/api/leads/{id}", get(handlers::get_lead).patch(handlers::update_lead))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("cannot bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

pub async fn start(settings: &Settings) -> Result<(), ServerError> {
    let state = Arc::new(AppState::from_settings(settings)?);
    let app = build_router(state);
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;

    tracing::info!(%addr, data_dir = %settings.data_dir.display(), offline = settings.offline, "tablero server listening");
    eprintln!("  Tablero server listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
