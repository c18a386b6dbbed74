//! Configuration management for chatshell
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! Precedence is file, then environment, then command line.

use crate::error::{ChatError, Result};
use crate::prompts;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Provider types accepted in `provider.type`
pub const VALID_PROVIDERS: [&str; 1] = ["gemini"];

/// Upper bound for `chat.title_max_chars`
pub const MAX_TITLE_CHARS: usize = 200;

/// Main configuration structure for chatshell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Completion provider configuration
    pub provider: ProviderConfig,
    /// Chat behaviour configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Provider configuration
///
/// Specifies which completion provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Google Gemini configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Google Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model used until changed at runtime
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API base URL (overridable so tests can point at a mock server)
    #[serde(default = "default_gemini_api_base")]
    pub api_base: String,

    /// API key; usually supplied through the environment instead
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    60
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_base: default_gemini_api_base(),
            api_key: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Chat behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System instruction sent with every request; blank disables it
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Characters of the first message kept in a conversation title
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,

    /// Ask the model to ground answers with web search
    #[serde(default)]
    pub search_grounding: bool,

    /// Strip tool-call residue and code fences from replies
    #[serde(default = "default_clean_responses")]
    pub clean_responses: bool,

    /// Assistant reply recorded when a request fails
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

fn default_system_prompt() -> String {
    prompts::DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_title_max_chars() -> usize {
    crate::chat::DEFAULT_TITLE_MAX_CHARS
}

fn default_clean_responses() -> bool {
    true
}

fn default_fallback_reply() -> String {
    prompts::FALLBACK_REPLY.to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
            title_max_chars: default_title_max_chars(),
            search_grounding: false,
            clean_responses: default_clean_responses(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default_config()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn default_config() -> Self {
        Self {
            provider: ProviderConfig {
                provider_type: "gemini".to_string(),
                gemini: GeminiConfig::default(),
            },
            chat: ChatConfig::default(),
        }
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(ChatError::from)
            .with_context(|| format!("Failed to read config file {}", path))?;
        serde_yaml::from_str(&contents)
            .map_err(ChatError::from)
            .with_context(|| format!("Failed to parse config {}", path))
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("CHATSHELL_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("CHATSHELL_MODEL") {
            self.provider.gemini.model = model;
        }

        if let Ok(api_base) = std::env::var("CHATSHELL_API_BASE") {
            self.provider.gemini.api_base = api_base;
        }

        if let Some(api_key) = std::env::var("CHATSHELL_API_KEY")
            .ok()
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
        {
            self.provider.gemini.api_key = Some(api_key);
        }

        if let Ok(timeout) = std::env::var("CHATSHELL_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.provider.gemini.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CHATSHELL_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(grounding) = std::env::var("CHATSHELL_SEARCH_GROUNDING") {
            match grounding.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.chat.search_grounding = true,
                "0" | "false" | "no" | "off" => self.chat.search_grounding = false,
                _ => tracing::warn!("Invalid CHATSHELL_SEARCH_GROUNDING: {}", grounding),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(model) = cli.model_override() {
            self.provider.gemini.model = model.to_string();
        }
    }

    /// Returns true if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.provider
            .gemini
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Warns once if no API key is configured
    ///
    /// Requests are still attempted without a key; they fail and produce
    /// the fallback reply.
    pub fn report_missing_credentials(&self) {
        if !self.has_api_key() {
            tracing::warn!(
                "{}",
                ChatError::MissingCredentials(format!(
                    "{} (set CHATSHELL_API_KEY or GOOGLE_API_KEY)",
                    self.provider.provider_type
                ))
            );
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type.is_empty() {
            return Err(ChatError::Config("Provider type cannot be empty".to_string()).into());
        }

        if !VALID_PROVIDERS.contains(&self.provider.provider_type.as_str()) {
            return Err(ChatError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                VALID_PROVIDERS.join(", ")
            ))
            .into());
        }

        if self.provider.gemini.model.trim().is_empty() {
            return Err(ChatError::Config("gemini.model cannot be empty".to_string()).into());
        }

        let api_base = url::Url::parse(&self.provider.gemini.api_base).map_err(|e| {
            ChatError::Config(format!(
                "gemini.api_base is not a valid URL ({}): {}",
                self.provider.gemini.api_base, e
            ))
        })?;
        if !matches!(api_base.scheme(), "http" | "https") {
            return Err(ChatError::Config(format!(
                "gemini.api_base must use http or https, got {}",
                api_base.scheme()
            ))
            .into());
        }

        if self.provider.gemini.timeout_seconds == 0 {
            return Err(
                ChatError::Config("timeout_seconds must be greater than 0".to_string()).into(),
            );
        }

        if self.chat.title_max_chars == 0 || self.chat.title_max_chars > MAX_TITLE_CHARS {
            return Err(ChatError::Config(format!(
                "chat.title_max_chars must be between 1 and {}",
                MAX_TITLE_CHARS
            ))
            .into());
        }

        if self.chat.fallback_reply.trim().is_empty() {
            return Err(
                ChatError::Config("chat.fallback_reply cannot be empty".to_string()).into(),
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}
