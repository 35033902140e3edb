//! Test doubles shared by the engine's unit tests.

use async_trait::async_trait;
use llm_proxy::{ChatBackend, ChatRequest};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned replies in order and records every request it receives.
/// Once the script runs out it keeps answering with prose.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<llm_proxy::Result<String>>>,
    seen: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<llm_proxy::Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn seen(&self) -> Vec<ChatRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, request: &ChatRequest) -> llm_proxy::Result<String> {
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("still not json".into()))
    }
}
