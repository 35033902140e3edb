//! Bounded retry loop around the chat backend.

use crate::config::EngineConfig;
use crate::extract::{extract_artifacts, ArtifactSet};
use crate::prompt::FORMAT_REMINDER;
use llm_proxy::{ChatBackend, ChatMessage, ChatRequest};
use std::fmt;
use tracing::{debug, warn};

/// Why one attempt did not yield a usable artifact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Transport, status or response-decoding error from the backend.
    Backend(String),
    /// The reply arrived but held no valid artifact object.
    Unparsable(String),
    /// The artifact set parsed but could not be applied to disk.
    Apply(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Backend(e) => write!(f, "backend error: {e}"),
            AttemptFailure::Unparsable(e) => write!(f, "unparsable output: {e}"),
            AttemptFailure::Apply(e) => write!(f, "could not apply artifacts: {e}"),
        }
    }
}

/// Result of driving the backend to completion or exhaustion.
#[derive(Debug)]
pub enum Invocation<T> {
    Success { value: T, attempts: u32 },
    Exhausted { attempts: u32, last: Option<AttemptFailure> },
}

impl<T> Invocation<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            Invocation::Success { attempts, .. } | Invocation::Exhausted { attempts, .. } => {
                *attempts
            }
        }
    }
}

/// Drives a [`ChatBackend`] with format-reminder retries and linear backoff.
pub struct Invoker<'a, B: ?Sized> {
    backend: &'a B,
    config: &'a EngineConfig,
}

impl<'a, B: ChatBackend + ?Sized> Invoker<'a, B> {
    pub fn new(backend: &'a B, config: &'a EngineConfig) -> Self {
        Self { backend, config }
    }

    /// Request artifacts until one reply parses or attempts run out.
    pub async fn invoke(&self, request: ChatRequest) -> Invocation<ArtifactSet> {
        self.invoke_with(request, |artifacts| Ok(artifacts)).await
    }

    /// Like [`invoke`](Self::invoke), but each parsed artifact set is passed to
    /// `accept`. `Ok` ends the loop and an `Err` counts as a failed attempt.
    /// Callers that must stop without retrying return their abort value
    /// inside `Ok`.
    pub async fn invoke_with<T, F>(&self, mut request: ChatRequest, mut accept: F) -> Invocation<T>
    where
        F: FnMut(ArtifactSet) -> std::result::Result<T, AttemptFailure>,
    {
        let max = self.config.max_attempts.max(1);
        let mut last = None;

        for attempt in 1..=max {
            let failure = match self.backend.complete(&request).await {
                Ok(text) => match extract_artifacts(&text) {
                    Ok(artifacts) => {
                        debug!(attempt, files = artifacts.len(), "model reply parsed");
                        match accept(artifacts) {
                            Ok(value) => {
                                return Invocation::Success {
                                    value,
                                    attempts: attempt,
                                }
                            }
                            Err(failure) => failure,
                        }
                    }
                    Err(e) => AttemptFailure::Unparsable(e.to_string()),
                },
                Err(e) => AttemptFailure::Backend(e.to_string()),
            };

            warn!(attempt, max_attempts = max, error = %failure, "generation attempt failed");
            last = Some(failure);

            if attempt < max {
                tokio::time::sleep(self.config.backoff_for(attempt)).await;
                request.push(ChatMessage::system(FORMAT_REMINDER));
            }
        }

        Invocation::Exhausted {
            attempts: max,
            last,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
