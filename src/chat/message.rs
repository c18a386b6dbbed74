//! Transcript message types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person at the keyboard
    User,
    /// Produced by the model (or the fallback reply)
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single turn in a conversation
///
/// Messages are immutable values; editing a message replaces it with a new
/// one.
///
/// # Examples
///
/// ```
/// use chatshell::chat::{Message, Role};
///
/// let msg = Message::user("Hello!");
/// assert_eq!(msg.role(), Role::User);
/// assert_eq!(msg.content(), "Hello!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
}

impl Message {
    /// Creates a message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message
    ///
    /// # Examples
    ///
    /// ```
    /// use chatshell::chat::{Message, Role};
    ///
    /// let msg = Message::assistant("Hi there");
    /// assert_eq!(msg.role(), Role::Assistant);
    /// ```
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Returns the role of the message author
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the message text
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns true if this message was typed by the user
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}
