//! Publishing a generated directory: either reported in place, or committed
//! with git and pushed to a GitHub repository with Pages enabled.

use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use pagesmith_core::io::write_if_missing;
use tokio::process::Command;
use tracing::{info, warn};

pub const DEFAULT_REMOTE_BASE: &str = "https://github.com";
const GITIGNORE: &str = ".env\nAIPIPE_TOKEN\n";
const COMMIT_MESSAGE: &str = "Deploy generated site";

/// Where a round ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Published {
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not prepare repository files: {0}")]
    Prepare(#[from] pagesmith_core::PagesmithError),

    #[error("`git {command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("GitHub API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("GitHub API request failed")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API response had no login")]
    MissingLogin,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, dir: &Path, repo_name: &str) -> Result<Published, PublishError>;
}

// ---------------------------------------------------------------------------
// LocalPublisher
// ---------------------------------------------------------------------------

/// Leaves the directory where it is and reports it as a `file://` URL.
pub struct LocalPublisher;

#[async_trait]
impl Publisher for LocalPublisher {
    async fn publish(&self, dir: &Path, _repo_name: &str) -> Result<Published, PublishError> {
        Ok(Published {
            repo_url: file_url(dir),
            ..Default::default()
        })
    }
}

pub fn file_url(dir: &Path) -> String {
    let abs = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    format!("file://{}", abs.display())
}

// ---------------------------------------------------------------------------
// GitPublisher
// ---------------------------------------------------------------------------

pub struct GitPublisher {
    http: reqwest::Client,
    token: Option<String>,
    api_base: String,
    /// Prefix for push remotes; `{remote_base}/{owner}/{repo}.git`.
    remote_base: String,
    author_name: String,
    author_email: String,
}

impl GitPublisher {
    pub fn new(http: reqwest::Client, token: Option<String>, api_base: impl Into<String>) -> Self {
        Self {
            http,
            token: token.filter(|t| !t.trim().is_empty()),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            remote_base: DEFAULT_REMOTE_BASE.to_string(),
            author_name: "pagesmith".to_string(),
            author_email: "pagesmith@users.noreply.github.com".to_string(),
        }
    }

    pub fn with_remote_base(mut self, remote_base: impl Into<String>) -> Self {
        self.remote_base = remote_base.into().trim_end_matches('/').to_string();
        self
    }

    async fn git(&self, dir: &Path, args: &[&str]) -> Result<String, PublishError> {
        let output = Command::new("git")
            .arg("-c")
            .arg(format!("user.name={}", self.author_name))
            .arg("-c")
            .arg(format!("user.email={}", self.author_email))
            .args(args)
            .current_dir(dir)
            .output()
            .await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            // The first argument is enough to identify the step without echoing
            // remotes that may carry credentials.
            Err(PublishError::Git {
                command: args.first().copied().unwrap_or_default().to_string(),
                stderr: redact(&String::from_utf8_lossy(&output.stderr), self.token.as_deref()),
            })
        }
    }

    async fn commit(&self, dir: &Path) -> Result<(), PublishError> {
        if !dir.join(".git").exists() {
            self.git(dir, &["init"]).await?;
        }
        write_if_missing(&dir.join(".gitignore"), GITIGNORE.as_bytes())?;
        write_if_missing(&dir.join(".nojekyll"), b"")?;

        self.git(dir, &["add", "."]).await?;
        if let Err(e) = self.git(dir, &["commit", "-m", COMMIT_MESSAGE]).await {
            info!(error = %e, "nothing new to commit; creating empty commit");
            if let Err(e) = self
                .git(dir, &["commit", "--allow-empty", "-m", COMMIT_MESSAGE])
                .await
            {
                warn!(error = %e, "empty commit failed");
            }
        }
        self.git(dir, &["branch", "-M", "main"]).await?;
        Ok(())
    }

    async fn api_get_login(&self, token: &str) -> Result<String, PublishError> {
        let endpoint = format!("{}/user", self.api_base);
        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, "pagesmith")
            .send()
            .await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Api {
                endpoint,
                status,
                body,
            });
        }
        let user: serde_json::Value = response.json().await?;
        user.get("login")
            .and_then(|l| l.as_str())
            .map(str::to_string)
            .ok_or(PublishError::MissingLogin)
    }

    async fn api_post(
        &self,
        token: &str,
        path: &str,
        body: serde_json::Value,
    ) -> Result<u16, PublishError> {
        let response = self
            .http
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, "pagesmith")
            .json(&body)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    fn push_url(&self, owner: &str, repo: &str, token: &str) -> String {
        match self.remote_base.strip_prefix("https://") {
            Some(host) => format!("https://x-access-token:{token}@{host}/{owner}/{repo}.git"),
            None => format!("{}/{owner}/{repo}.git", self.remote_base),
        }
    }

    async fn push_to_github(
        &self,
        dir: &Path,
        repo_name: &str,
        token: &str,
    ) -> Result<(String, String), PublishError> {
        let owner = self.api_get_login(token).await?;

        let status = self
            .api_post(
                token,
                "/user/repos",
                serde_json::json!({ "name": repo_name, "private": false }),
            )
            .await?;
        match status {
            201 => info!(%owner, repo = repo_name, "created GitHub repository"),
            422 => info!(%owner, repo = repo_name, "GitHub repository already exists"),
            other => {
                return Err(PublishError::Api {
                    endpoint: "/user/repos".into(),
                    status: other,
                    body: String::new(),
                })
            }
        }

        let push_url = self.push_url(&owner, repo_name, token);
        self.git(dir, &["push", "--force", &push_url, "HEAD:main"])
            .await?;
        info!(%owner, repo = repo_name, "pushed main");

        let pages = self
            .api_post(
                token,
                &format!("/repos/{owner}/{repo_name}/pages"),
                serde_json::json!({ "source": { "branch": "main", "path": "/" } }),
            )
            .await;
        match pages {
            Ok(201 | 204 | 409 | 422) => info!("GitHub Pages enabled"),
            Ok(status) => warn!(status, "enabling GitHub Pages returned unexpected status"),
            Err(e) => warn!(error = %e, "enabling GitHub Pages failed"),
        }

        Ok((
            format!("{DEFAULT_REMOTE_BASE}/{owner}/{repo_name}.git"),
            format!("https://{owner}.github.io/{repo_name}/"),
        ))
    }
}

#[async_trait]
impl Publisher for GitPublisher {
    async fn publish(&self, dir: &Path, repo_name: &str) -> Result<Published, PublishError> {
        self.commit(dir).await?;

        let (repo_url, pages_url) = match self.token.as_deref() {
            Some(token) => self.push_to_github(dir, repo_name, token).await?,
            None => {
                warn!("no GitHub token configured; committed locally only");
                (file_url(dir), String::new())
            }
        };

        let commit_sha = match self.git(dir, &["rev-parse", "HEAD"]).await {
            Ok(sha) => sha,
            Err(e) => {
                warn!(error = %e, "could not resolve HEAD");
                String::new()
            }
        };

        Ok(Published {
            repo_url,
            commit_sha,
            pages_url,
        })
    }
}

fn redact(text: &str, token: Option<&str>) -> String {
    match token {
        Some(t) if !t.is_empty() => text.replace(t, "***"),
        _ => text.to_string(),
    }
}
