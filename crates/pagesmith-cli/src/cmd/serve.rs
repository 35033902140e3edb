use super::{truthy, EngineArgs};
use anyhow::Context;
use clap::{ArgAction, Args};
use pagesmith_server::config::{DEFAULT_GITHUB_API, DEFAULT_REPOS_DIR};
use pagesmith_server::{AppState, ServiceConfig};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (0 = OS-assigned)
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Shared secret every deploy request must carry
    #[arg(long, env = "DEPLOY_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Parent directory of the per-task repositories
    #[arg(long, env = "DEPLOY_REPOS_DIR", default_value = DEFAULT_REPOS_DIR)]
    pub repos_dir: PathBuf,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API)]
    pub github_api: String,

    /// Publish locally instead of pushing to GitHub
    #[arg(long, env = "SKIP_GITHUB", action = ArgAction::Set, value_parser = truthy, num_args = 0..=1,
          default_value = "false", default_missing_value = "true")]
    pub skip_github: bool,

    /// Do not call the evaluation URL
    #[arg(long, env = "SKIP_EVALUATOR", action = ArgAction::Set, value_parser = truthy, num_args = 0..=1,
          default_value = "false", default_missing_value = "true")]
    pub skip_evaluator: bool,

    #[command(flatten)]
    pub engine: EngineArgs,
}

pub fn run(args: ServeArgs) -> anyhow::Result<()> {
    if args.secret.trim().is_empty() {
        anyhow::bail!("DEPLOY_SECRET must not be empty");
    }

    let port = args.port;
    let mut config = ServiceConfig::new(args.secret, args.repos_dir);
    config.github_token = args.github_token.filter(|t| !t.is_empty());
    config.github_api = args.github_api;
    config.skip_github = args.skip_github;
    config.skip_evaluator = args.skip_evaluator;
    config.llm_token_set = args.engine.token_set();
    config
        .prepare_repos_dir()
        .context("no usable repositories directory")?;

    if !config.llm_token_set {
        tracing::warn!("AIPIPE_TOKEN is not set; every round will use the fallback synthesizer");
    }

    let generator = args.engine.generator()?;
    let state = AppState::new(config, generator);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        tokio::select! {
            res = pagesmith_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
