pub mod attachments;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod publish;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{EvaluatorConfig, ServiceConfig};
pub use state::AppState;

/// Build the axum Router with all routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api-deploy", post(routes::deploy::deploy))
        .route("/health", get(routes::health::health))
        .route("/debug", get(routes::health::debug_info))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Start the deployment webhook on `0.0.0.0:{port}`.
pub async fn serve(app_state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(app_state, listener).await
}

/// Start the deployment webhook on a pre-bound listener.
///
/// Unlike `serve`, this accepts a `TcpListener` that was already bound so the
/// caller can read the actual port before starting (useful when `port = 0` and
/// the OS picks a free port).
pub async fn serve_on(app_state: AppState, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let repos_dir = app_state.config.repos_dir.display().to_string();
    let app = build_router(app_state);

    tracing::info!(%repos_dir, "pagesmith listening on http://localhost:{actual_port}");

    axum::serve(listener, app).await?;
    Ok(())
}
