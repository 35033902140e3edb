//! Delivery of the deployment callback to the evaluation endpoint.

use crate::config::EvaluatorConfig;
use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Statuses worth retrying; anything else outside 2xx fails immediately.
pub const RETRYABLE_STATUS: &[u16] = &[408, 425, 429, 500, 502, 503, 504];

/// Body sent to the evaluator once a round has been published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackPayload {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("evaluator URL is empty")]
    EmptyUrl,

    #[error("evaluator rejected the callback with status {status}")]
    Rejected { status: u16, body: String },

    #[error("failed to notify evaluator after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, url: &str, payload: &CallbackPayload) -> Result<(), NotifyError>;
}

pub struct HttpNotifier {
    http: reqwest::Client,
    config: EvaluatorConfig,
}

impl HttpNotifier {
    pub fn new(http: reqwest::Client, config: EvaluatorConfig) -> Self {
        Self { http, config }
    }

    /// `(2^attempt + jitter) × unit`, with jitter drawn from `[0, 1)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let jitter: f64 = rand::thread_rng().gen();
        let factor = 2f64.powi(attempt as i32) + jitter;
        self.config.backoff_unit.mul_f64(factor)
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, url: &str, payload: &CallbackPayload) -> Result<(), NotifyError> {
        if url.trim().is_empty() {
            error!("evaluator URL is empty");
            return Err(NotifyError::EmptyUrl);
        }

        let attempts = self.config.attempts.max(1);
        for i in 0..attempts {
            let last = i + 1 == attempts;
            info!(url, attempt = i + 1, attempts, "notifying evaluator");

            let sent = self
                .http
                .post(url)
                .header(reqwest::header::USER_AGENT, &self.config.user_agent)
                .timeout(self.config.timeout)
                .json(payload)
                .send()
                .await;

            match sent {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        info!(status, "evaluator accepted callback");
                        return Ok(());
                    }
                    let body: String = response
                        .text()
                        .await
                        .unwrap_or_default()
                        .chars()
                        .take(500)
                        .collect();
                    if RETRYABLE_STATUS.contains(&status) && !last {
                        warn!(status, body = %body, "retryable evaluator response");
                        tokio::time::sleep(self.backoff(i)).await;
                        continue;
                    }
                    error!(status, body = %body, "evaluator rejected callback");
                    return Err(NotifyError::Rejected { status, body });
                }
                Err(e) if !last => {
                    warn!(error = %e, "evaluator request failed; will retry");
                    tokio::time::sleep(self.backoff(i)).await;
                }
                Err(e) => {
                    error!(error = %e, "evaluator request failed; no retries left");
                }
            }
        }

        Err(NotifyError::Exhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CallbackPayload {
        CallbackPayload {
            email: "a@b.c".into(),
            task: "demo".into(),
            round: 1,
            nonce: "n1".into(),
            repo_url: "file:///tmp/demo".into(),
            commit_sha: String::new(),
            pages_url: String::new(),
        }
    }

    fn notifier(attempts: u32) -> HttpNotifier {
        HttpNotifier::new(
            reqwest::Client::new(),
            EvaluatorConfig {
                attempts,
                backoff_unit: Duration::ZERO,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn accepted_on_first_try() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/notify")
            .match_header("user-agent", mockito::Matcher::Regex("^pagesmith/".into()))
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "task": "demo",
                "round": 1,
                "nonce": "n1"
            })))
            .with_status(202)
            .expect(1)
            .create_async()
            .await;

        notifier(4)
            .notify(&format!("{}/notify", server.url()), &payload())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn retryable_status_is_retried_until_exhausted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/notify")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let err = notifier(3)
            .notify(&format!("{}/notify", server.url()), &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Rejected { status: 503, .. }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_retryable_status_fails_immediately() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/notify")
            .with_status(400)
            .with_body("bad payload")
            .expect(1)
            .create_async()
            .await;

        let err = notifier(4)
            .notify(&format!("{}/notify", server.url()), &payload())
            .await
            .unwrap_err();
        match err {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad payload");
            }
            other => panic!("unexpected error: {other}"),
        }
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_url_is_an_error() {
        let err = notifier(4).notify("  ", &payload()).await.unwrap_err();
        assert!(matches!(err, NotifyError::EmptyUrl));
    }

    #[tokio::test]
    async fn transport_errors_exhaust() {
        let err = notifier(2)
            .notify("http://127.0.0.1:9/notify", &payload())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Exhausted { attempts: 2 }));
    }
}
