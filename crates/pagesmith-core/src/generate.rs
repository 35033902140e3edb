//! Top-level generation flow for one round.
//!
//! ```text
//! Continuity ─► build_request ─► Invoker ──success──► reconcile ─┐
//!                                   │                            ├─► persist_fingerprint
//!                                   └──exhausted──► synthesize ──┘
//! ```

use crate::config::EngineConfig;
use crate::continuity::Continuity;
use crate::error::Result;
use crate::fallback;
use crate::invoker::{AttemptFailure, Invocation, Invoker};
use crate::io::ensure_dir;
use crate::license::current_mit_license;
use crate::persist::persist_fingerprint;
use crate::prompt::build_request;
use crate::reconcile::reconcile;
use crate::round::RoundContext;
use llm_proxy::ChatBackend;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Which path produced the round's artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationSource {
    Llm,
    Fallback,
}

/// Successful result of one round.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub status: &'static str,
    pub source: GenerationSource,
    /// Model attempts made, including the successful one.
    pub attempts: u32,
    /// Relative paths written in this round.
    pub files: Vec<String>,
}

impl GenerationOutcome {
    fn ok(source: GenerationSource, attempts: u32, files: Vec<String>) -> Self {
        Self {
            status: "ok",
            source,
            attempts,
            files,
        }
    }
}

/// The round engine. Holds the model backend and engine tunables; carries no
/// per-round state, so one instance can serve every request.
pub struct Generator<B> {
    backend: B,
    config: EngineConfig,
}

impl<B: ChatBackend> Generator<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one round against `dir`.
    ///
    /// Only structural-precondition failures (an update round on a directory
    /// lacking its core files) and fallback I/O errors reach the caller.
    /// Model and parse failures are retried, then absorbed by the fallback.
    pub async fn generate(&self, ctx: &RoundContext, dir: &Path) -> Result<GenerationOutcome> {
        ensure_dir(dir)?;

        let continuity = Continuity::load(dir, ctx.round, self.config.snapshot_chars);
        let request = build_request(ctx, &continuity);
        let license = current_mit_license(&self.config.license_owner);

        let invocation = Invoker::new(&self.backend, &self.config)
            .invoke_with(request, |artifacts| {
                match reconcile(dir, ctx, &artifacts, &license) {
                    Ok(files) => Ok(Ok(files)),
                    Err(e) if e.is_structural() => Ok(Err(e)),
                    Err(e) => Err(AttemptFailure::Apply(e.to_string())),
                }
            })
            .await;

        let outcome = match invocation {
            Invocation::Success {
                value: Ok(files),
                attempts,
            } => {
                info!(task = %ctx.task, round = %ctx.round, attempts, files = files.len(), "round generated by model");
                GenerationOutcome::ok(GenerationSource::Llm, attempts, files)
            }
            Invocation::Success { value: Err(e), .. } => return Err(e),
            Invocation::Exhausted { attempts, last } => {
                warn!(
                    task = %ctx.task,
                    round = %ctx.round,
                    attempts,
                    last_error = %last.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "model attempts exhausted; using fallback"
                );
                let files = fallback::synthesize(dir, ctx, &license)?;
                GenerationOutcome::ok(GenerationSource::Fallback, attempts, files)
            }
        };

        persist_fingerprint(dir);
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
