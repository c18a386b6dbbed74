//! Google Gemini provider implementation for chatshell
//!
//! This module implements the `CompletionService` trait against the Gemini
//! `generateContent` REST endpoint. Single-turn and multi-turn requests use
//! the same endpoint; the difference is only in the `contents` sent.

use crate::config::GeminiConfig;
use crate::error::{ChatError, Result};
use crate::providers::{
    ChatTurn, CompletionService, ModelInfo, RequestCapability, RequestConfig, TurnRole,
};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini API provider
///
/// # Examples
///
/// ```no_run
/// use chatshell::config::GeminiConfig;
/// use chatshell::providers::{CompletionService, GeminiProvider, RequestConfig};
///
/// # async fn example() -> chatshell::error::Result<()> {
/// let provider = GeminiProvider::new(GeminiConfig::default())?;
/// let reply = provider
///     .single_turn_complete("Hello!", &RequestConfig::new("gemini-2.5-flash"))
///     .await?;
/// println!("{}", reply);
/// # Ok(())
/// # }
/// ```
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiInstruction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
}

/// One turn of content
#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

/// System instruction; has no role
#[derive(Debug, Serialize)]
struct GeminiInstruction {
    parts: Vec<GeminiPart>,
}

/// A content part; only text parts are produced or consumed
#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

/// Tool declaration attached to a request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

/// Response from `generateContent`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Response from `GET models`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Model metadata from `GET models`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    input_token_limit: Option<u32>,
    #[serde(default)]
    output_token_limit: Option<u32>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl GeminiContent {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        }
    }
}

impl From<GeminiModel> for ModelInfo {
    fn from(model: GeminiModel) -> Self {
        let name = model
            .name
            .strip_prefix("models/")
            .unwrap_or(&model.name)
            .to_string();
        let display_name = if model.display_name.is_empty() {
            name.clone()
        } else {
            model.display_name
        };

        let mut info = ModelInfo::new(name, display_name);
        info.description = model.description;
        info.input_token_limit = model.input_token_limit;
        info.output_token_limit = model.output_token_limit;
        info.supported_methods = model.supported_generation_methods;
        info
    }
}

impl GeminiProvider {
    /// Create a new Gemini provider instance
    ///
    /// # Arguments
    ///
    /// * `config` - Gemini configuration with API base, key and timeout
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    ///
    /// # Examples
    ///
    /// ```
    /// use chatshell::config::GeminiConfig;
    /// use chatshell::providers::GeminiProvider;
    ///
    /// let provider = GeminiProvider::new(GeminiConfig::default());
    /// assert!(provider.is_ok());
    /// ```
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("chatshell/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ChatError::from)
            .context("Failed to create HTTP client")?;

        tracing::info!(
            "Initialized Gemini provider: api_base={}, model={}",
            config.api_base,
            config.model
        );

        Ok(Self {
            client,
            config,
        })
    }

    /// Get the configured API base URL
    ///
    /// # Examples
    ///
    /// ```
    /// use chatshell::config::GeminiConfig;
    /// use chatshell::providers::GeminiProvider;
    ///
    /// let provider = GeminiProvider::new(GeminiConfig::default()).unwrap();
    /// assert_eq!(provider.api_base(), "https://generativelanguage.googleapis.com");
    /// ```
    pub fn api_base(&self) -> &str {
        self.config.api_base.trim_end_matches('/')
    }

    fn api_key(&self) -> Option<&str> {
        self.config.api_key.as_deref()
    }

    /// Model id as a single URL path segment
    ///
    /// A leading `models/` is accepted and stripped. Ids that would leave
    /// the `models/` collection or alter the query are rejected.
    fn model_segment(model_id: &str) -> Result<&str> {
        let id = model_id.trim();
        let id = id.strip_prefix("models/").unwrap_or(id);
        let invalid = id.is_empty()
            || id.contains("..")
            || id
                .chars()
                .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace());
        if invalid {
            return Err(
                ChatError::CompletionFailure(format!("Invalid model id: {:?}", model_id)).into(),
            );
        }
        Ok(id)
    }

    /// Build the request body for a conversation
    fn build_request(&self, turns: &[ChatTurn], config: &RequestConfig) -> GenerateContentRequest {
        let contents = turns
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    TurnRole::User => "user",
                    TurnRole::Model => "model",
                };
                GeminiContent::text(role, &turn.text)
            })
            .collect();

        let system_instruction =
            config
                .system_instruction
                .as_ref()
                .map(|instruction| GeminiInstruction {
                    parts: vec![GeminiPart {
                        text: Some(instruction.clone()),
                    }],
                });

        let tools = if config.has_capability(RequestCapability::SearchGrounding) {
            vec![GeminiTool {
                google_search: GoogleSearch {},
            }]
        } else {
            Vec::new()
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            tools,
        }
    }

    /// Extract the reply text from the first candidate
    fn extract_text(response: GenerateContentResponse) -> Result<String> {
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            ChatError::CompletionFailure("Gemini returned no candidates".to_string())
        })?;

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ChatError::CompletionFailure(format!(
                "Gemini returned an empty reply (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
            .into());
        }

        Ok(text)
    }

    /// Send a generateContent request
    async fn generate(&self, turns: &[ChatTurn], config: &RequestConfig) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base(),
            Self::model_segment(&config.model_id)?
        );
        let body = self.build_request(turns, config);

        tracing::debug!(
            "Sending Gemini request: model={}, turns={}, grounding={}",
            config.model_id,
            turns.len(),
            !body.tools.is_empty()
        );

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = self.api_key() {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to reach Gemini: {}", e);
            ChatError::CompletionFailure(format!("Failed to reach Gemini: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Gemini returned error {}: {}", status, error_text);
            return Err(ChatError::CompletionFailure(format!(
                "Gemini returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse Gemini response: {}", e);
            ChatError::CompletionFailure(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = Self::extract_text(parsed)?;
        tracing::debug!("Received Gemini reply: {} chars", text.chars().count());
        Ok(text)
    }
}

#[async_trait]
impl CompletionService for GeminiProvider {
    async fn single_turn_complete(&self, prompt: &str, config: &RequestConfig) -> Result<String> {
        self.generate(&[ChatTurn::user(prompt)], config).await
    }

    async fn chat_complete(&self, history: &[ChatTurn], config: &RequestConfig) -> Result<String> {
        if history.is_empty() {
            return Err(
                ChatError::CompletionFailure("Conversation history is empty".to_string()).into(),
            );
        }
        self.generate(history, config).await
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/v1beta/models", self.api_base());
        let api_key = self.api_key();
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            tracing::debug!("Fetching models from Gemini: {}", url);

            let mut request = self.client.get(&url);
            if let Some(key) = api_key {
                request = request.header(API_KEY_HEADER, key);
            }
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!("Failed to fetch Gemini models: {}", e);
                    ChatError::from(e)
                })
                .context("Failed to reach Gemini")?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                tracing::error!("Gemini returned error {}: {}", status, error_text);
                return Err(ChatError::Provider(format!(
                    "Gemini returned error {}: {}",
                    status, error_text
                ))
                .into());
            }

            let page: GeminiModelsResponse = response
                .json()
                .await
                .map_err(|e| {
                    tracing::error!("Failed to parse Gemini models response: {}", e);
                    ChatError::from(e)
                })
                .context("Failed to parse Gemini models response")?;

            models.extend(page.models.into_iter().map(ModelInfo::from));

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!("Fetched {} models from Gemini", models.len());
        Ok(models)
    }
}
