use thiserror::Error;

#[derive(Debug, Error)]
pub enum PagesmithError {
    #[error("invalid round {0}: rounds start at 1")]
    InvalidRound(u32),

    #[error("invalid repository name {0:?}: use lower-case letters, digits, '.', '_' or '-'")]
    InvalidRepoName(String),

    #[error("round {round} update requested but the target directory is missing required files: {}", missing.join(", "))]
    MissingRequiredArtifacts { round: u32, missing: Vec<String> },

    #[error("round {round} update requested but LICENSE is missing in the target directory")]
    LicenseMissing { round: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PagesmithError {
    /// Structural-precondition failures: an update round against a directory
    /// that was never initialized. These are never retried.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PagesmithError::MissingRequiredArtifacts { .. } | PagesmithError::LicenseMissing { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PagesmithError>;
