//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::HoneybeeError;
use crate::server::handlers::{
    deploy_handler, deploy_status_handler, deploy_stop_handler, deploy_support_handler,
    generate_handler, health_handler, history_handler, import_url_handler, version_handler,
};
use crate::server::state::ServerState;

/// Build the API router
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        // Health and version
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        // Generation
        .route("/generate", post(generate_handler))
        .route("/sources/url", post(import_url_handler))
        // History
        .route("/history", get(history_handler))
        // Local deploy
        .route("/deploy/support", get(deploy_support_handler))
        .route("/deploy", post(deploy_handler).get(deploy_status_handler))
        .route("/deploy/stop", post(deploy_stop_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), HoneybeeError>>, HoneybeeError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| HoneybeeError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| HoneybeeError::ServerError(e.to_string()))
    });

    Ok(handle)
}
