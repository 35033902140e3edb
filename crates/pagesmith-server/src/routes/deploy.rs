use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use pagesmith_core::paths::validate_repo_name;
use pagesmith_core::{Round, RoundContext};
use serde::Deserialize;
use tracing::{error, info, warn, Instrument};

use crate::attachments::{save_attachments, Attachment};
use crate::error::AppError;
use crate::evaluator::CallbackPayload;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub email: String,
    pub secret: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: String,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub template: Option<String>,
}

/// Directory name for a task: spaces become hyphens, then lower-cased.
/// The result still has to pass [`validate_repo_name`] before use.
pub fn repo_name(task: &str) -> String {
    task.replace(' ', "-").to_lowercase()
}

/// POST /api-deploy — generate (or update) a task's site, publish it and
/// notify the evaluator.
pub async fn deploy(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    if body.is_empty() {
        warn!("empty request body received");
        return Err(AppError::bad_request("Empty request body"));
    }
    let payload: serde_json::Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "invalid JSON payload");
        AppError::bad_request("Invalid JSON payload")
    })?;
    let req: DeployRequest = serde_json::from_value(payload).map_err(|e| {
        warn!(error = %e, "payload validation failed");
        AppError::bad_request(format!("Payload validation failed: {e}"))
    })?;

    if req.secret != app.config.secret {
        warn!(task = %req.task, "invalid secret provided");
        return Err(AppError::bad_request("invalid secret"));
    }
    let round = Round::new(req.round).map_err(|e| AppError::bad_request(e.to_string()))?;
    let name = repo_name(&req.task);
    validate_repo_name(&name).map_err(|e| {
        warn!(task = %req.task, "rejected task name");
        AppError::bad_request(e.to_string())
    })?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("deploy", %request_id, task = %req.task, %round);
    run_deploy(app, req, name, round).instrument(span).await
}

async fn run_deploy(
    app: AppState,
    req: DeployRequest,
    name: String,
    round: Round,
) -> Result<Json<serde_json::Value>, AppError> {
    let lock = app.task_lock(&name);
    let result = {
        let _guard = lock.lock().await;
        deploy_locked(&app, req, &name, round).await
    };
    drop(lock);
    app.prune_task_lock(&name);
    result
}

async fn deploy_locked(
    app: &AppState,
    req: DeployRequest,
    name: &str,
    round: Round,
) -> Result<Json<serde_json::Value>, AppError> {
    let repo_path = app.config.repos_dir.join(name);
    std::fs::create_dir_all(&repo_path)?;

    let attachments = req.attachments.as_deref().unwrap_or_default();
    let saved = save_attachments(&app.http, attachments, &repo_path)
        .await
        .map_err(|_| AppError::bad_request("failed saving attachments"))?;

    let ctx = RoundContext::new(&req.task, round, &req.brief)
        .with_checks(req.checks.iter().cloned())
        .with_attachments(saved.iter().map(|p| p.display().to_string()))
        .with_template(req.template.clone());

    let outcome = match app.generator.generate(&ctx, &repo_path).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_structural() => {
            error!(error = %e, "round rejected: target directory is not a valid base");
            return Err(e.into());
        }
        Err(e) => {
            error!(error = %e, "generation failed");
            return Err(AppError::internal("AI generation failed"));
        }
    };
    info!(source = ?outcome.source, attempts = outcome.attempts, files = outcome.files.len(), "round generated");

    let published = app
        .publisher
        .publish(&repo_path, name)
        .await
        .map_err(|e| {
            error!(error = %e, "publishing failed");
            AppError::internal("GitHub operations failed")
        })?;

    let callback = CallbackPayload {
        email: req.email,
        task: req.task,
        round: round.get(),
        nonce: req.nonce,
        repo_url: published.repo_url,
        commit_sha: published.commit_sha,
        pages_url: published.pages_url,
    };

    if app.config.skip_evaluator {
        info!("evaluator notification skipped");
    } else if let Err(e) = app.notifier.notify(&req.evaluation_url, &callback).await {
        error!(error = %e, "evaluator notification failed");
    }

    let mut body = serde_json::to_value(&callback)?;
    if let Some(map) = body.as_object_mut() {
        map.insert("ok".into(), serde_json::Value::Bool(true));
    }
    Ok(Json(body))
}
