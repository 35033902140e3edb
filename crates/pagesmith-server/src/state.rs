use crate::config::ServiceConfig;
use crate::evaluator::{HttpNotifier, Notifier};
use crate::publish::{GitPublisher, LocalPublisher, Publisher};
use llm_proxy::ChatBackend;
use pagesmith_core::Generator;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type SharedGenerator = Generator<Arc<dyn ChatBackend>>;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub generator: Arc<SharedGenerator>,
    pub publisher: Arc<dyn Publisher>,
    pub notifier: Arc<dyn Notifier>,
    pub http: reqwest::Client,
    /// One async mutex per task name; rounds of the same task never overlap.
    task_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AppState {
    /// Wire the production collaborators for `config`.
    pub fn new(config: ServiceConfig, generator: SharedGenerator) -> Self {
        let http = reqwest::Client::new();
        let publisher: Arc<dyn Publisher> = if config.skip_github {
            Arc::new(LocalPublisher)
        } else {
            Arc::new(GitPublisher::new(
                http.clone(),
                config.github_token.clone(),
                config.github_api.clone(),
            ))
        };
        let notifier = Arc::new(HttpNotifier::new(http.clone(), config.evaluator.clone()));
        Self {
            config: Arc::new(config),
            generator: Arc::new(generator),
            publisher,
            notifier,
            http,
            task_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// The lock guarding every round of `task`.
    pub fn task_lock(&self, task: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .task_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(task.to_string()).or_default().clone()
    }

    /// Drop the lock entry for `task` once no round holds or awaits it.
    pub fn prune_task_lock(&self, task: &str) {
        let mut locks = self
            .task_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks.get(task).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(task);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.task_locks.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesmith_core::EngineConfig;

    fn state() -> AppState {
        let backend: Arc<dyn ChatBackend> = Arc::new(
            llm_proxy::ProxyClient::new(llm_proxy::ProxyConfig::default()).unwrap(),
        );
        AppState::new(
            ServiceConfig::new("s", "/tmp/pagesmith-test"),
            Generator::new(backend, EngineConfig::default()),
        )
    }

    #[test]
    fn same_task_shares_a_lock() {
        let s = state();
        assert!(Arc::ptr_eq(&s.task_lock("demo"), &s.task_lock("demo")));
        assert!(!Arc::ptr_eq(&s.task_lock("demo"), &s.task_lock("other")));
    }

    #[test]
    fn clones_share_locks() {
        let s = state();
        let c = s.clone();
        assert!(Arc::ptr_eq(&s.task_lock("demo"), &c.task_lock("demo")));
    }

    #[test]
    fn idle_locks_are_pruned() {
        let s = state();
        drop(s.task_lock("demo"));
        s.prune_task_lock("demo");
        assert_eq!(s.tracked_locks(), 0);
    }

    #[test]
    fn held_locks_survive_pruning() {
        let s = state();
        let held = s.task_lock("demo");
        s.prune_task_lock("demo");
        assert_eq!(s.tracked_locks(), 1);
        assert!(Arc::ptr_eq(&held, &s.task_lock("demo")));
    }
}
