use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_REPOS_DIR: &str = "generated_repos";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Runtime settings for the deployment service. Assembled once by the binary.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Shared secret every deploy request must carry.
    pub secret: String,
    /// Parent of every per-task working directory.
    pub repos_dir: PathBuf,
    pub github_token: Option<String>,
    /// GitHub REST base URL; overridable so tests can point it at a mock.
    pub github_api: String,
    pub skip_github: bool,
    pub skip_evaluator: bool,
    pub evaluator: EvaluatorConfig,
    /// Presence flag for the model token, reported by `/debug`.
    pub llm_token_set: bool,
}

impl ServiceConfig {
    pub fn new(secret: impl Into<String>, repos_dir: impl Into<PathBuf>) -> Self {
        Self {
            secret: secret.into(),
            repos_dir: repos_dir.into(),
            github_token: None,
            github_api: DEFAULT_GITHUB_API.to_string(),
            skip_github: false,
            skip_evaluator: false,
            evaluator: EvaluatorConfig::default(),
            llm_token_set: false,
        }
    }

    /// Create `repos_dir`, falling back to `<tmp>/generated_repos` when it cannot
    /// be created. Returns the directory actually in use.
    pub fn prepare_repos_dir(&mut self) -> std::io::Result<&Path> {
        match std::fs::create_dir_all(&self.repos_dir) {
            Ok(()) => {
                info!(dir = %self.repos_dir.display(), "repos directory ready");
            }
            Err(e) => {
                let fallback = std::env::temp_dir().join(DEFAULT_REPOS_DIR);
                warn!(
                    dir = %self.repos_dir.display(),
                    fallback = %fallback.display(),
                    error = %e,
                    "cannot create repos directory; using fallback"
                );
                std::fs::create_dir_all(&fallback)?;
                self.repos_dir = fallback;
            }
        }
        Ok(&self.repos_dir)
    }
}

/// Retry policy for the evaluation callback.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub attempts: u32,
    pub timeout: Duration,
    /// Backoff before retry `i` (0-based) is `(2^i + jitter) × backoff_unit`.
    pub backoff_unit: Duration,
    pub user_agent: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            attempts: 4,
            timeout: Duration::from_secs(10),
            backoff_unit: Duration::from_secs(1),
            user_agent: concat!("pagesmith/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// `1`, `true` and `yes` (any case) are truthy; everything else is not.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}
