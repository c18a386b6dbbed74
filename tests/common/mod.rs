use async_trait::async_trait;
use chatshell::error::{ChatError, Result};
use chatshell::providers::{ChatTurn, CompletionService, RequestConfig};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;
use tokio::sync::Notify;

/// A request received by [`ScriptedService`]
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Single { prompt: String, model: String },
    Chat { history: Vec<ChatTurn>, model: String },
}

/// Completion service that replays a fixed script of replies
///
/// Each call pops the next scripted result; `Err` entries become
/// completion failures. Calls past the end of the script fail.
#[allow(dead_code)]
pub struct ScriptedService {
    script: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl ScriptedService {
    pub fn new(script: Vec<std::result::Result<&str, &str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies successfully with each of `replies` in order
    pub fn replying(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(*r)).collect())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self, call: Call) -> Result<String> {
        self.calls.lock().unwrap().push(call);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(error)) => Err(ChatError::CompletionFailure(error).into()),
            None => Err(ChatError::CompletionFailure("script exhausted".to_string()).into()),
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn single_turn_complete(&self, prompt: &str, config: &RequestConfig) -> Result<String> {
        self.next(Call::Single {
            prompt: prompt.to_string(),
            model: config.model_id.clone(),
        })
    }

    async fn chat_complete(&self, history: &[ChatTurn], config: &RequestConfig) -> Result<String> {
        self.next(Call::Chat {
            history: history.to_vec(),
            model: config.model_id.clone(),
        })
    }
}

/// Completion service that holds every call until released
///
/// Each call signals `started`, then waits for one `release` before
/// replying with the prompt's last turn prefixed by `re:`.
#[allow(dead_code)]
#[derive(Default)]
pub struct HeldService {
    pub started: Notify,
    pub release: Notify,
    pub models: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl HeldService {
    async fn hold(&self, text: &str, config: &RequestConfig) -> Result<String> {
        self.models.lock().unwrap().push(config.model_id.clone());
        self.started.notify_one();
        self.release.notified().await;
        Ok(format!("re:{}", text))
    }
}

#[async_trait]
impl CompletionService for HeldService {
    async fn single_turn_complete(&self, prompt: &str, config: &RequestConfig) -> Result<String> {
        self.hold(prompt, config).await
    }

    async fn chat_complete(&self, history: &[ChatTurn], config: &RequestConfig) -> Result<String> {
        let last = history.last().map(|t| t.text.as_str()).unwrap_or_default();
        self.hold(last, config).await
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Configuration YAML pointing the Gemini provider at `api_base`
#[allow(dead_code)]
pub fn config_yaml_for(api_base: &str) -> String {
    format!(
        r#"
provider:
  type: gemini
  gemini:
    model: gemini-2.5-flash
    api_base: {}
    api_key: test-key
    timeout_seconds: 5
chat:
  system_prompt: "Answer briefly."
"#,
        api_base
    )
}
