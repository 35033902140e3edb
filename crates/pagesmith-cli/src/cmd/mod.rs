pub mod fingerprint;
pub mod generate;
pub mod serve;

use anyhow::Context;
use clap::Args;
use llm_proxy::{ChatBackend, ProxyClient, ProxyConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use pagesmith_core::{EngineConfig, Generator, OwnerHints};
use std::sync::Arc;
use std::time::Duration;

/// Model and engine settings shared by `serve` and `generate`.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Chat-completions proxy base URL
    #[arg(long, env = "PAGESMITH_LLM_URL", default_value = DEFAULT_BASE_URL)]
    pub llm_url: String,

    /// Bearer token for the proxy
    #[arg(long, env = "AIPIPE_TOKEN", hide_env_values = true)]
    pub llm_token: Option<String>,

    /// Model identifier sent with every request
    #[arg(long, env = "PAGESMITH_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Model attempts before the deterministic fallback runs
    #[arg(long, default_value = "3")]
    pub attempts: u32,

    /// Linear retry backoff unit in milliseconds
    #[arg(long, default_value = "1000")]
    pub retry_unit_ms: u64,

    /// Preferred LICENSE copyright holder
    #[arg(long, env = "DEPLOY_AUTHOR")]
    pub author: Option<String>,

    #[arg(long, env = "GITHUB_USER", hide = true)]
    pub github_user: Option<String>,

    #[arg(long, env = "GITHUB_ACTOR", hide = true)]
    pub github_actor: Option<String>,
}

impl EngineArgs {
    pub fn token_set(&self) -> bool {
        self.llm_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn engine_config(&self) -> EngineConfig {
        let hints = OwnerHints {
            deploy_author: self.author.clone(),
            github_user: self.github_user.clone(),
            github_actor: self.github_actor.clone(),
        };
        EngineConfig {
            max_attempts: self.attempts,
            backoff_unit: Duration::from_millis(self.retry_unit_ms),
            ..Default::default()
        }
        .with_owner(&hints)
    }

    pub fn generator(&self) -> anyhow::Result<Generator<Arc<dyn ChatBackend>>> {
        let client = ProxyClient::new(ProxyConfig {
            base_url: self.llm_url.clone(),
            token: self.llm_token.clone(),
            model: self.model.clone(),
            ..Default::default()
        })
        .context("failed to build LLM proxy client")?;
        let backend: Arc<dyn ChatBackend> = Arc::new(client);
        Ok(Generator::new(backend, self.engine_config()))
    }
}

/// Clap value parser for `1|true|yes` style switches read from the environment.
pub fn truthy(value: &str) -> Result<bool, String> {
    Ok(pagesmith_server::config::parse_flag(value))
}
