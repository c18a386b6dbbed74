//! Test utilities for chatshell
//!
//! This module provides common test helpers: temporary files, error
//! assertions, test configuration and a completion service whose replies
//! can be held back to exercise in-flight behaviour.

use crate::config::Config;
use crate::error::Result;
use crate::providers::{ChatTurn, CompletionService, RequestConfig};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a test file with the given content
///
/// # Panics
///
/// Panics if file creation or writing fails
pub fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

/// Create a test configuration with default values
pub fn test_config() -> Config {
    Config::default()
}

/// Create a test configuration YAML string
pub fn test_config_yaml() -> String {
    r#"
provider:
  type: gemini
  gemini:
    model: gemini-2.5-flash-lite
    api_base: http://127.0.0.1:9
    timeout_seconds: 5

chat:
  system_prompt: "Answer briefly."
  title_max_chars: 40
  search_grounding: false
  clean_responses: true
"#
    .to_string()
}

/// Completion service that blocks each call until released
///
/// Every call signals `started` and then waits on `gate` before replying.
/// Clones share the gate, the signal and the call counter.
#[derive(Clone)]
pub struct GatedService {
    reply: String,
    started: Arc<Notify>,
    gate: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

impl GatedService {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            started: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Notified once per call, when the call has started
    pub fn started(&self) -> Arc<Notify> {
        Arc::clone(&self.started)
    }

    /// Notify this to let one waiting call reply
    pub fn gate(&self) -> Arc<Notify> {
        Arc::clone(&self.gate)
    }

    /// Number of calls received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn reply(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.gate.notified().await;
        Ok(self.reply.clone())
    }
}

#[async_trait]
impl CompletionService for GatedService {
    async fn single_turn_complete(&self, _prompt: &str, _config: &RequestConfig) -> Result<String> {
        self.reply().await
    }

    async fn chat_complete(&self, _history: &[ChatTurn], _config: &RequestConfig) -> Result<String> {
        self.reply().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_create_test_file() {
        let dir = temp_dir();
        let path = create_test_file(&dir, "test.txt", "content");
        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "content");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(ChatError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        assert_error_contains(Ok(()), "error");
    }

    #[test]
    fn test_test_config_yaml_is_valid() {
        let config: Config = serde_yaml::from_str(&test_config_yaml()).unwrap();
        assert_eq!(config.provider.gemini.model, "gemini-2.5-flash-lite");
        assert!(config.validate().is_ok());
        assert!(test_config().validate().is_ok());
    }

    #[tokio::test]
    async fn test_gated_service_waits_for_gate() {
        let service = GatedService::new("done");
        let gate = service.gate();
        gate.notify_one();

        let reply = service
            .single_turn_complete("hi", &RequestConfig::new("m"))
            .await
            .unwrap();
        assert_eq!(reply, "done");
        assert_eq!(service.calls(), 1);
    }
}
