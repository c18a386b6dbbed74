//! Conversation records held by the store

use super::labels;
use super::message::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Title shown for a regular conversation before its first message
pub const NEW_CHAT_TITLE: &str = "New chat";

/// Title shown for a temporary conversation before its first message
pub const TEMPORARY_CHAT_TITLE: &str = "Temporary chat";

/// Stable identifier of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(Uuid);

impl ConversationId {
    /// Generates a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier from its string form
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// First eight characters, for compact listings
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A titled, timestamped sequence of messages
///
/// Only the [`ConversationStore`](super::ConversationStore) mutates a
/// conversation; outside the store it is read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    title: String,
    messages: Vec<Message>,
    created_at: DateTime<Utc>,
    is_temporary: bool,
}

impl Conversation {
    /// Creates an empty conversation stamped with the current time
    pub fn new(is_temporary: bool) -> Self {
        Self::new_at(is_temporary, Utc::now())
    }

    /// Creates an empty conversation with an explicit creation time
    pub fn new_at(is_temporary: bool, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ConversationId::new(),
            title: Self::default_title(is_temporary).to_string(),
            messages: Vec::new(),
            created_at,
            is_temporary,
        }
    }

    /// Title used while a conversation has no messages
    pub fn default_title(is_temporary: bool) -> &'static str {
        if is_temporary {
            TEMPORARY_CHAT_TITLE
        } else {
            NEW_CHAT_TITLE
        }
    }

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_temporary(&self) -> bool {
        self.is_temporary
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index of the only message that may be edited and resubmitted
    ///
    /// That is the most recent user message: the one right before the last
    /// assistant reply, or the final message if no reply followed it.
    pub fn editable_index(&self) -> Option<usize> {
        editable_index(&self.messages)
    }

    /// Replaces the message list and recomputes the title
    pub(crate) fn set_messages(&mut self, messages: Vec<Message>, title_max_chars: usize) {
        self.title = if messages.is_empty() {
            Self::default_title(self.is_temporary).to_string()
        } else {
            labels::derive_title(&messages, title_max_chars)
        };
        self.messages = messages;
    }

    #[cfg(test)]
    pub(crate) fn with_messages(is_temporary: bool, messages: Vec<Message>) -> Self {
        let mut conversation = Self::new(is_temporary);
        conversation.set_messages(messages, labels::DEFAULT_TITLE_MAX_CHARS);
        conversation
    }
}

/// See [`Conversation::editable_index`]
pub fn editable_index(messages: &[Message]) -> Option<usize> {
    match messages {
        [] => None,
        [.., last] if last.role() == Role::User => Some(messages.len() - 1),
        [.., prev, _] if prev.role() == Role::User => Some(messages.len() - 2),
        _ => None,
    }
}
