//! Request lifecycle controller
//!
//! Turns user input into completion requests and merges the replies back
//! into the store. Each submission goes Idle → Pending → Idle; only one
//! submission may be pending at a time.
//!
//! At submit time the controller captures the target conversation's id and
//! a snapshot of its messages. The reply (or the fallback reply on failure)
//! is appended to that snapshot and written back by id, so switching or
//! creating conversations while a request is in flight never misroutes it.

use super::conversation::{Conversation, ConversationId};
use super::message::Message;
use super::store::SharedStore;
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::prompts;
use crate::providers::{
    clean_response, ChatTurn, CompletionService, RequestCapability, RequestConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Process-wide model selection
///
/// Cloned handles share one value. The controller reads it once per
/// request, so a change made while a request is pending applies to the
/// next one.
///
/// # Examples
///
/// ```
/// use chatshell::chat::ModelSelection;
///
/// let selection = ModelSelection::new("gemini-2.5-flash");
/// let handle = selection.clone();
/// handle.set("gemini-2.5-flash-lite");
/// assert_eq!(selection.get(), "gemini-2.5-flash-lite");
/// ```
#[derive(Debug, Clone)]
pub struct ModelSelection {
    inner: Arc<RwLock<String>>,
}

impl ModelSelection {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model_id.into())),
        }
    }

    /// Current model id
    pub fn get(&self) -> String {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the model id
    pub fn set(&self, model_id: impl Into<String>) {
        let model_id = model_id.into();
        tracing::info!("Model changed to {}", model_id);
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = model_id;
    }
}

/// Settings applied to every request the controller sends
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// System instruction, if any
    pub system_instruction: Option<String>,
    /// Request search grounding
    pub search_grounding: bool,
    /// Run replies through [`clean_response`]
    pub clean_responses: bool,
    /// Assistant text recorded when a request fails
    pub fallback_reply: String,
}

impl RequestOptions {
    /// Builds the options from the `chat` section of the configuration
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            system_instruction: prompts::system_instruction(&config.system_prompt),
            search_grounding: config.search_grounding,
            clean_responses: config.clean_responses,
            fallback_reply: config.fallback_reply.clone(),
        }
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// Why a submission did not start a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The input was empty or whitespace
    EmptyInput,
    /// Another request is still pending
    Busy,
    /// No edit is in progress, or the edited message is no longer editable
    NoEdit,
}

/// Result of a submission or an edit save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing was sent
    Ignored(IgnoreReason),
    /// The reply was appended to the conversation
    Replied {
        conversation_id: ConversationId,
        reply: String,
    },
    /// The request failed and the fallback reply was appended
    Fallback {
        conversation_id: ConversationId,
        error: String,
    },
    /// The conversation was deleted before the reply arrived
    Dropped { conversation_id: ConversationId },
}

impl SubmitOutcome {
    /// Conversation the request targeted, if one was sent
    pub fn conversation_id(&self) -> Option<ConversationId> {
        match self {
            Self::Ignored(_) => None,
            Self::Replied {
                conversation_id, ..
            }
            | Self::Fallback {
                conversation_id, ..
            }
            | Self::Dropped { conversation_id } => Some(*conversation_id),
        }
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// Clears the pending flag when dropped
struct PendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PendingGuard<'a> {
    /// Sets the flag, or returns None if it was already set
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Message being edited: conversation and index
#[derive(Debug, Clone, Copy)]
struct EditTarget {
    conversation_id: ConversationId,
    index: usize,
}

/// Drives submissions and edits against a shared store
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use chatshell::chat::{ModelSelection, RequestController, RequestOptions, SharedStore};
/// use chatshell::config::GeminiConfig;
/// use chatshell::providers::GeminiProvider;
///
/// # async fn example() -> chatshell::error::Result<()> {
/// let controller = RequestController::new(
///     SharedStore::default(),
///     Arc::new(GeminiProvider::new(GeminiConfig::default())?),
///     ModelSelection::new("gemini-2.5-flash"),
///     RequestOptions::default(),
/// );
/// let outcome = controller.send("What is a borrow checker?").await;
/// println!("{:?}", outcome);
/// # Ok(())
/// # }
/// ```
pub struct RequestController {
    store: SharedStore,
    service: Arc<dyn CompletionService>,
    model: ModelSelection,
    options: RequestOptions,
    pending: AtomicBool,
    input: Mutex<String>,
    editing: Mutex<Option<EditTarget>>,
}

impl RequestController {
    pub fn new(
        store: SharedStore,
        service: Arc<dyn CompletionService>,
        model: ModelSelection,
        options: RequestOptions,
    ) -> Self {
        Self {
            store,
            service,
            model,
            options,
            pending: AtomicBool::new(false),
            input: Mutex::new(String::new()),
            editing: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn model(&self) -> &ModelSelection {
        &self.model
    }

    pub fn service(&self) -> &Arc<dyn CompletionService> {
        &self.service
    }

    /// Replaces the input draft
    pub fn set_input(&self, text: impl Into<String>) {
        *self.input.lock().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    /// Current input draft
    pub fn input(&self) -> String {
        self.input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True while a request is in flight
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// True if `submit` would send the current draft
    pub fn can_send(&self) -> bool {
        !self.is_pending() && !self.input().trim().is_empty()
    }

    /// Sets the draft to `text` and submits it
    pub async fn send(&self, text: impl Into<String>) -> SubmitOutcome {
        self.set_input(text);
        self.submit().await
    }

    /// Submits the input draft
    ///
    /// Appends the draft as a user message to the current conversation
    /// (creating a regular one if none is current), clears the draft and
    /// waits for the reply. Empty drafts and submissions while a request is
    /// pending are ignored and leave the draft untouched.
    pub async fn submit(&self) -> SubmitOutcome {
        let text = self.input();
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        let Some(pending) = PendingGuard::acquire(&self.pending) else {
            tracing::debug!("Ignoring submit while a request is pending");
            return SubmitOutcome::Ignored(IgnoreReason::Busy);
        };

        let (conversation_id, messages) = {
            let mut store = self.store.write();
            let conversation_id = match store.current_id() {
                Some(id) => id,
                None => store.create_conversation(false).id(),
            };
            let mut messages = store
                .get(conversation_id)
                .map(|c| c.messages().to_vec())
                .unwrap_or_default();
            messages.push(Message::user(text));
            store.replace_messages(conversation_id, messages.clone());
            (conversation_id, messages)
        };
        self.set_input(String::new());

        self.dispatch(conversation_id, messages, pending).await
    }

    /// Index of the message in the current conversation that may be edited
    pub fn editable_index(&self) -> Option<usize> {
        self.store
            .read()
            .current()
            .and_then(Conversation::editable_index)
    }

    /// Index of the message being edited, if an edit is in progress
    pub fn editing(&self) -> Option<usize> {
        self.editing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|target| target.index)
    }

    /// Starts editing message `index` of the current conversation
    ///
    /// Returns the message's current text.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::EditNotAllowed` if a request is pending or
    /// `index` is not the most recent user message.
    pub fn begin_edit(&self, index: usize) -> Result<String> {
        if self.is_pending() {
            return Err(ChatError::EditNotAllowed {
                index,
                reason: "a request is pending".to_string(),
            }
            .into());
        }

        let store = self.store.read();
        let conversation = store.current().ok_or_else(|| ChatError::EditNotAllowed {
            index,
            reason: "no conversation is selected".to_string(),
        })?;

        if conversation.editable_index() != Some(index) {
            return Err(ChatError::EditNotAllowed {
                index,
                reason: "only the latest user message can be edited".to_string(),
            }
            .into());
        }

        let content = conversation.messages()[index].content().to_string();
        *self.editing.lock().unwrap_or_else(PoisonError::into_inner) = Some(EditTarget {
            conversation_id: conversation.id(),
            index,
        });
        tracing::debug!(conversation = %conversation.id(), index, "Editing message");
        Ok(content)
    }

    /// Abandons the edit in progress
    pub fn cancel_edit(&self) {
        self.editing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Saves the edit in progress and resubmits
    ///
    /// Messages after the edited one are discarded; the edited message gets
    /// `text` as its content and the truncated list is sent.
    pub async fn save_edit(&self, text: impl Into<String>) -> SubmitOutcome {
        let text = text.into();
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        let target = {
            let mut editing = self.editing.lock().unwrap_or_else(PoisonError::into_inner);
            if editing.is_some() && self.is_pending() {
                return SubmitOutcome::Ignored(IgnoreReason::Busy);
            }
            editing.take()
        };
        let Some(target) = target else {
            return SubmitOutcome::Ignored(IgnoreReason::NoEdit);
        };

        let Some(pending) = PendingGuard::acquire(&self.pending) else {
            *self.editing.lock().unwrap_or_else(PoisonError::into_inner) = Some(target);
            return SubmitOutcome::Ignored(IgnoreReason::Busy);
        };

        let messages = {
            let mut store = self.store.write();
            let Some(conversation) = store.get(target.conversation_id) else {
                tracing::debug!(conversation = %target.conversation_id, "Edited conversation no longer exists");
                return SubmitOutcome::Ignored(IgnoreReason::NoEdit);
            };
            if conversation.editable_index() != Some(target.index) {
                return SubmitOutcome::Ignored(IgnoreReason::NoEdit);
            }

            let mut messages = conversation.messages()[..target.index].to_vec();
            messages.push(Message::user(text));
            store.replace_messages(target.conversation_id, messages.clone());
            messages
        };

        self.dispatch(target.conversation_id, messages, pending)
            .await
    }

    /// Builds the request configuration from the current model selection
    fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::new(self.model.get());
        if let Some(instruction) = &self.options.system_instruction {
            config = config.with_system_instruction(instruction.clone());
        }
        if self.options.search_grounding {
            config = config.with_capability(RequestCapability::SearchGrounding);
        }
        config
    }

    /// Sends `messages` and merges the reply into `conversation_id`
    ///
    /// `messages` ends with the new user message. The pending guard is held
    /// until the merge is done.
    async fn dispatch(
        &self,
        conversation_id: ConversationId,
        mut messages: Vec<Message>,
        _pending: PendingGuard<'_>,
    ) -> SubmitOutcome {
        let request = self.request_config();

        let result = match messages.as_slice() {
            [only] => {
                self.service
                    .single_turn_complete(only.content(), &request)
                    .await
            }
            _ => {
                let history: Vec<ChatTurn> = messages.iter().map(ChatTurn::from).collect();
                self.service.chat_complete(&history, &request).await
            }
        };

        let outcome = match result {
            Ok(reply) => {
                let reply = self.finish_reply(reply);
                messages.push(Message::assistant(reply.clone()));
                SubmitOutcome::Replied {
                    conversation_id,
                    reply,
                }
            }
            Err(e) => {
                tracing::error!(conversation = %conversation_id, "Completion failed: {:#}", e);
                messages.push(Message::assistant(self.options.fallback_reply.clone()));
                SubmitOutcome::Fallback {
                    conversation_id,
                    error: e.to_string(),
                }
            }
        };

        if self.store.write().replace_messages(conversation_id, messages) {
            outcome
        } else {
            tracing::debug!(conversation = %conversation_id, "Dropping reply for deleted conversation");
            SubmitOutcome::Dropped { conversation_id }
        }
    }

    /// Applies response cleaning, keeping the raw reply if nothing survives
    fn finish_reply(&self, reply: String) -> String {
        if !self.options.clean_responses {
            return reply;
        }
        let cleaned = clean_response(&reply);
        if cleaned.is_empty() {
            tracing::debug!("Cleaning removed the whole reply, keeping it unchanged");
            reply
        } else {
            cleaned
        }
    }
}
