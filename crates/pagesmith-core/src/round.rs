use crate::error::{PagesmithError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Round
// ---------------------------------------------------------------------------

/// Generation cycle number. Round 1 creates; every later round only updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Round(u32);

impl Round {
    pub const FIRST: Round = Round(1);

    pub fn new(n: u32) -> Result<Self> {
        if n == 0 {
            return Err(PagesmithError::InvalidRound(n));
        }
        Ok(Round(n))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_initial(self) -> bool {
        self.0 == 1
    }

    pub fn is_update(self) -> bool {
        self.0 > 1
    }
}

impl TryFrom<u32> for Round {
    type Error = PagesmithError;

    fn try_from(n: u32) -> Result<Self> {
        Round::new(n)
    }
}

impl From<Round> for u32 {
    fn from(r: Round) -> u32 {
        r.0
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// RoundContext
// ---------------------------------------------------------------------------

/// Everything the caller supplies for one round. Rebuilt on every invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundContext {
    pub task: String,
    pub round: Round,
    pub brief: String,
    /// Literal requirements; each must surface verbatim in the output.
    #[serde(default)]
    pub checks: Vec<String>,
    /// Attachments already materialized on disk (or raw data URIs).
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Advisory template hint; carried into the prompt only.
    #[serde(default)]
    pub template: Option<String>,
}

impl RoundContext {
    pub fn new(task: impl Into<String>, round: Round, brief: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            round,
            brief: brief.into(),
            checks: Vec::new(),
            attachments: Vec::new(),
            template: None,
        }
    }

    pub fn with_checks<I, S>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checks = checks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_attachments<I, S>(mut self, attachments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attachments = attachments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_template(mut self, template: Option<String>) -> Self {
        self.template = template;
        self
    }

    /// Bare file names of the attachments, as the model must reference them.
    pub fn attachment_names(&self) -> Vec<String> {
        self.attachments
            .iter()
            .filter(|a| !a.starts_with("data:"))
            .map(|a| {
                PathBuf::from(a)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| a.clone())
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
