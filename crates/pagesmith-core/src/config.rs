use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// OwnerHints
// ---------------------------------------------------------------------------

pub const DEFAULT_LICENSE_OWNER: &str = "Generated Project";

/// Identity hints used to name the copyright holder in the generated LICENSE.
///
/// Precedence: `deploy_author` → `github_user` → `github_actor` → default.
/// Blank values are treated as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerHints {
    #[serde(default)]
    pub deploy_author: Option<String>,
    #[serde(default)]
    pub github_user: Option<String>,
    #[serde(default)]
    pub github_actor: Option<String>,
}

impl OwnerHints {
    pub fn resolve(&self) -> String {
        [&self.deploy_author, &self.github_user, &self.github_actor]
            .into_iter()
            .filter_map(|hint| hint.as_deref())
            .map(str::trim)
            .find(|hint| !hint.is_empty())
            .unwrap_or(DEFAULT_LICENSE_OWNER)
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tunables for one generation engine. Constructed once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// LLM attempts before falling back to the synthesizer.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Linear backoff unit: attempt `n` waits `n × backoff_unit` before retrying.
    #[serde(default = "default_backoff_unit", with = "duration_millis")]
    pub backoff_unit: Duration,
    /// Character budget per prior-artifact snapshot in the prompt.
    #[serde(default = "default_snapshot_chars")]
    pub snapshot_chars: usize,
    /// Copyright holder written into LICENSE.
    #[serde(default = "default_license_owner")]
    pub license_owner: String,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit() -> Duration {
    Duration::from_secs(1)
}

fn default_snapshot_chars() -> usize {
    4000
}

fn default_license_owner() -> String {
    DEFAULT_LICENSE_OWNER.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit: default_backoff_unit(),
            snapshot_chars: default_snapshot_chars(),
            license_owner: default_license_owner(),
        }
    }
}

impl EngineConfig {
    pub fn with_owner(mut self, hints: &OwnerHints) -> Self {
        self.license_owner = hints.resolve();
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_unit * attempt
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
