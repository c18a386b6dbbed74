//! Base completion service trait and request types
//!
//! This module defines the `CompletionService` trait that text-generation
//! backends implement, together with the typed request configuration and
//! the model metadata returned by model listing.

use crate::chat::{Message, Role};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Role of a turn as the completion API sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// Text typed by the user
    User,
    /// Text previously produced by the model
    Model,
}

/// One entry of the history passed to [`CompletionService::chat_complete`]
///
/// # Examples
///
/// ```
/// use chatshell::chat::Message;
/// use chatshell::providers::{ChatTurn, TurnRole};
///
/// let turn = ChatTurn::from(&Message::assistant("Hi"));
/// assert_eq!(turn.role, TurnRole::Model);
/// assert_eq!(turn.text, "Hi");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who produced the turn
    pub role: TurnRole,
    /// Turn text
    pub text: String,
}

impl ChatTurn {
    /// Creates a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    /// Creates a model turn
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

impl From<&Message> for ChatTurn {
    fn from(message: &Message) -> Self {
        match message.role() {
            Role::User => Self::user(message.content()),
            Role::Assistant => Self::model(message.content()),
        }
    }
}

/// Optional request features a backend may honour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestCapability {
    /// Let the model ground its answer with a web search tool
    SearchGrounding,
}

/// Per-request settings: model, system instruction and capabilities
///
/// # Examples
///
/// ```
/// use chatshell::providers::{RequestCapability, RequestConfig};
///
/// let config = RequestConfig::new("gemini-2.5-flash")
///     .with_system_instruction("Be brief.")
///     .with_capability(RequestCapability::SearchGrounding);
///
/// assert_eq!(config.model_id, "gemini-2.5-flash");
/// assert!(config.has_capability(RequestCapability::SearchGrounding));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Model identifier sent to the backend
    pub model_id: String,
    /// Optional system instruction prepended by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    /// Enabled request capabilities
    #[serde(default)]
    pub capabilities: Vec<RequestCapability>,
}

impl RequestConfig {
    /// Creates a configuration for `model_id` with no instruction or capabilities
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            system_instruction: None,
            capabilities: Vec::new(),
        }
    }

    /// Sets the system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Enables a capability; enabling twice has no further effect
    pub fn with_capability(mut self, capability: RequestCapability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Returns true if `capability` is enabled
    pub fn has_capability(&self, capability: RequestCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Metadata about a model offered by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Identifier usable as `RequestConfig::model_id` (e.g. "gemini-2.5-flash")
    pub name: String,
    /// Human-friendly name
    pub display_name: String,
    /// Short description, empty when the backend gives none
    #[serde(default)]
    pub description: String,
    /// Maximum input tokens, if reported
    #[serde(default)]
    pub input_token_limit: Option<u32>,
    /// Maximum output tokens, if reported
    #[serde(default)]
    pub output_token_limit: Option<u32>,
    /// Backend methods the model supports (e.g. "generateContent")
    #[serde(default)]
    pub supported_methods: Vec<String>,
}

impl ModelInfo {
    /// Create a new ModelInfo instance
    ///
    /// # Examples
    ///
    /// ```
    /// use chatshell::providers::ModelInfo;
    ///
    /// let model = ModelInfo::new("gemini-2.5-flash", "Gemini 2.5 Flash");
    /// assert_eq!(model.name, "gemini-2.5-flash");
    /// assert!(model.supported_methods.is_empty());
    /// ```
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            input_token_limit: None,
            output_token_limit: None,
            supported_methods: Vec::new(),
        }
    }

    /// Returns true if the model can be used for text generation
    pub fn supports_generation(&self) -> bool {
        self.supported_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

/// Text-generation backend used by the request controller
///
/// Implementations perform one network call per invocation and report any
/// failure (transport, status, malformed body, empty reply) as an error.
///
/// # Examples
///
/// ```no_run
/// use async_trait::async_trait;
/// use chatshell::error::Result;
/// use chatshell::providers::{ChatTurn, CompletionService, RequestConfig};
///
/// struct Echo;
///
/// #[async_trait]
/// impl CompletionService for Echo {
///     async fn single_turn_complete(&self, prompt: &str, _: &RequestConfig) -> Result<String> {
///         Ok(prompt.to_string())
///     }
///
///     async fn chat_complete(&self, history: &[ChatTurn], _: &RequestConfig) -> Result<String> {
///         Ok(history.last().map(|t| t.text.clone()).unwrap_or_default())
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generates a reply to a single prompt with no prior history
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or yields no text
    async fn single_turn_complete(&self, prompt: &str, config: &RequestConfig) -> Result<String>;

    /// Generates a reply to a conversation
    ///
    /// `history` is ordered oldest first; its last entry is the new user turn.
    ///
    /// # Errors
    ///
    /// Returns error if the call fails or yields no text
    async fn chat_complete(&self, history: &[ChatTurn], config: &RequestConfig) -> Result<String>;

    /// Lists the models the backend offers
    ///
    /// # Default Implementation
    ///
    /// The default implementation returns an error indicating that model
    /// listing is not supported.
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Err(crate::error::ChatError::Provider(
            "Model listing is not supported by this provider".to_string(),
        )
        .into())
    }
}

/// Markers of tool-use and reasoning chatter that leak into replies
const NOISE_MARKERS: [&str; 5] = ["tool_code", "thought", "queries", "google_search", "print("];

/// Strips tool-call residue and code fences from a model reply
///
/// Lines mentioning tool or reasoning markers (in any case), lines opening a code fence
/// and lines containing `=[` are dropped; any fenced block still left is
/// then removed. The result is trimmed.
///
/// # Examples
///
/// ```
/// use chatshell::providers::clean_response;
///
/// let raw = "```tool_code\nprint(google_search.search(queries=[\"x\"]))\n```\nParis is the capital.";
/// assert_eq!(clean_response(raw), "Paris is the capital.");
/// ```
pub fn clean_response(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            !NOISE_MARKERS.iter().any(|marker| lower.contains(marker))
                && !line.trim_start().starts_with("```")
                && !line.contains("=[")
        })
        .collect();

    let mut cleaned = kept.join("\n");
    if let Ok(re) = Regex::new(r"(?s)```.*?```") {
        cleaned = re.replace_all(&cleaned, "").to_string();
    }
    cleaned.trim().to_string()
}
