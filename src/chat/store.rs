//! Conversation store
//!
//! The store is the sole owner of the conversation collection and of the
//! "current conversation" pointer. Every mutation goes through one of its
//! operations; each operation bumps a revision counter so a view can tell
//! when it needs to re-render.
//!
//! Conversations are kept newest-first. Lookups by id are linear, which is
//! fine for an interactive session's worth of conversations.

use super::conversation::{Conversation, ConversationId};
use super::labels::DEFAULT_TITLE_MAX_CHARS;
use super::message::Message;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Owns all conversations and the current selection
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    current: Option<ConversationId>,
    title_max_chars: usize,
    revision: u64,
}

impl ConversationStore {
    /// Creates an empty store with the default title length
    pub fn new() -> Self {
        Self::with_title_max_chars(DEFAULT_TITLE_MAX_CHARS)
    }

    /// Creates an empty store that cuts titles at `title_max_chars` characters
    pub fn with_title_max_chars(title_max_chars: usize) -> Self {
        Self {
            conversations: Vec::new(),
            current: None,
            title_max_chars,
            revision: 0,
        }
    }

    /// Creates a conversation, puts it at the front and makes it current
    ///
    /// # Examples
    ///
    /// ```
    /// use chatshell::chat::ConversationStore;
    ///
    /// let mut store = ConversationStore::new();
    /// let id = store.create_conversation(false).id();
    /// assert_eq!(store.current_id(), Some(id));
    /// assert_eq!(store.len(), 1);
    /// ```
    pub fn create_conversation(&mut self, is_temporary: bool) -> &Conversation {
        let conversation = Conversation::new(is_temporary);
        let id = conversation.id();
        tracing::debug!(%id, is_temporary, "Created conversation");

        self.conversations.insert(0, conversation);
        self.current = Some(id);
        self.touch();
        &self.conversations[0]
    }

    /// Removes a conversation
    ///
    /// Unknown ids are ignored. Returns whether anything was removed.
    pub fn delete_conversation(&mut self, id: ConversationId) -> bool {
        let before = self.conversations.len();
        self.conversations.retain(|c| c.id() != id);
        let removed = self.conversations.len() != before;

        if self.current == Some(id) {
            self.current = None;
        }

        if removed {
            tracing::debug!(%id, "Deleted conversation");
            self.touch();
        }
        removed
    }

    /// Makes a conversation current
    ///
    /// Unknown ids are ignored so a stale id from the view cannot clear the
    /// selection. Returns whether the selection changed to `id`.
    pub fn select_conversation(&mut self, id: ConversationId) -> bool {
        if self.get(id).is_none() {
            tracing::debug!(%id, "Ignoring selection of unknown conversation");
            return false;
        }
        self.current = Some(id);
        self.touch();
        true
    }

    /// Replaces the current conversation's messages and recomputes its title
    ///
    /// Does nothing when no conversation is current.
    pub fn update_current_messages(&mut self, messages: Vec<Message>) -> bool {
        match self.current {
            Some(id) => self.replace_messages(id, messages),
            None => false,
        }
    }

    /// Replaces the messages of the conversation with `id`, current or not
    ///
    /// Returns false if the conversation no longer exists.
    pub fn replace_messages(&mut self, id: ConversationId, messages: Vec<Message>) -> bool {
        let title_max_chars = self.title_max_chars;
        let Some(conversation) = self.conversations.iter_mut().find(|c| c.id() == id) else {
            return false;
        };
        conversation.set_messages(messages, title_max_chars);
        self.touch();
        true
    }

    /// Removes every temporary conversation
    ///
    /// Clears the selection if the current conversation was temporary.
    /// Returns the number of conversations removed.
    pub fn clear_temporary(&mut self) -> usize {
        let current_is_temporary = self.current().map(Conversation::is_temporary) == Some(true);

        let before = self.conversations.len();
        self.conversations.retain(|c| !c.is_temporary());
        let removed = before - self.conversations.len();

        if current_is_temporary {
            self.current = None;
        }
        if removed > 0 || current_is_temporary {
            tracing::debug!(removed, "Cleared temporary conversations");
            self.touch();
        }
        removed
    }

    /// Switches temporary mode on or off
    ///
    /// Turning it on starts a fresh temporary conversation. Turning it off
    /// discards all temporary conversations and starts a regular one.
    pub fn set_temporary_mode(&mut self, enabled: bool) -> ConversationId {
        if !enabled {
            self.clear_temporary();
        }
        self.create_conversation(enabled).id()
    }

    /// The current conversation, if any
    pub fn current(&self) -> Option<&Conversation> {
        self.current.and_then(|id| self.get(id))
    }

    pub fn current_id(&self) -> Option<ConversationId> {
        self.current
    }

    /// Looks a conversation up by id
    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id() == id)
    }

    /// All conversations, newest first
    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Monotonic counter bumped by every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to the one store shared by the controller and the view
///
/// Locks are short-lived and never held across an `.await`. Poisoned locks
/// are recovered.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<ConversationStore>>,
}

impl SharedStore {
    pub fn new(store: ConversationStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Shared read access
    pub fn read(&self) -> RwLockReadGuard<'_, ConversationStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive write access
    pub fn write(&self) -> RwLockWriteGuard<'_, ConversationStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
