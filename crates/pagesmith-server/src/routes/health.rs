use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /health — liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// GET /debug — runtime diagnostics. Reports whether secrets are configured,
/// never their values.
pub async fn debug_info(State(app): State<AppState>) -> Json<serde_json::Value> {
    let cfg = &app.config;
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    Json(serde_json::json!({
        "cwd": cwd,
        "repos_dir": cfg.repos_dir.display().to_string(),
        "github_token_set": cfg.github_token.as_deref().is_some_and(|t| !t.is_empty()),
        "llm_token_set": cfg.llm_token_set,
        "deploy_secret_set": !cfg.secret.is_empty(),
        "skip_github": cfg.skip_github,
        "skip_evaluator": cfg.skip_evaluator,
        "git_available": which::which("git").is_ok(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
