//! Provider module for chatshell
//!
//! This module contains the completion service abstraction and the
//! Google Gemini implementation.

pub mod base;
pub mod gemini;

pub use base::{
    clean_response, ChatTurn, CompletionService, ModelInfo, RequestCapability, RequestConfig,
    TurnRole,
};
pub use gemini::GeminiProvider;

#[cfg(test)]
pub use base::MockCompletionService;

use crate::config::ProviderConfig;
use crate::error::{ChatError, Result};

/// Create a completion service based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration; `provider_type` selects the backend
///
/// # Returns
///
/// Returns a boxed completion service
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
///
/// # Examples
///
/// ```
/// use chatshell::config::Config;
/// use chatshell::providers::create_service;
///
/// let config = Config::default();
/// assert!(create_service(&config.provider).is_ok());
/// ```
pub fn create_service(config: &ProviderConfig) -> Result<Box<dyn CompletionService>> {
    match config.provider_type.as_str() {
        "gemini" => Ok(Box::new(GeminiProvider::new(config.gemini.clone())?)),
        other => Err(ChatError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
