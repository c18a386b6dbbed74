//! chatshell - terminal chat client library
//!
//! This library provides the core of chatshell: an in-memory store of
//! conversations, a request controller that sends them to a completion
//! backend and merges the replies, and the Google Gemini backend itself.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `chat`: Messages, conversations, the store and the request controller
//! - `providers`: Completion service abstraction and the Gemini implementation
//! - `prompts`: Default system prompt and fallback reply
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: Handlers for the CLI commands
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatshell::chat::{ModelSelection, RequestController, RequestOptions, SharedStore};
//! use chatshell::providers::create_service;
//! use chatshell::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let controller = RequestController::new(
//!         SharedStore::default(),
//!         Arc::from(create_service(&config.provider)?),
//!         ModelSelection::new(config.provider.gemini.model.clone()),
//!         RequestOptions::from_config(&config.chat),
//!     );
//!     controller.send("Hello!").await;
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod prompts;
pub mod providers;

// Re-export commonly used types
pub use chat::{Conversation, ConversationStore, Message, RequestController, SharedStore};
pub use config::Config;
pub use error::{ChatError, Result};

#[cfg(test)]
pub mod test_utils;
