//! Conversation state and request lifecycle
//!
//! - `message`: immutable transcript messages
//! - `conversation`: conversation records and the editable-message rule
//! - `store`: the owned conversation collection and current selection
//! - `labels`: title derivation and relative timestamps
//! - `controller`: submission, edit and reply merging

pub mod controller;
pub mod conversation;
pub mod labels;
pub mod message;
pub mod store;

pub use controller::{
    IgnoreReason, ModelSelection, RequestController, RequestOptions, SubmitOutcome,
};
pub use conversation::{
    editable_index, Conversation, ConversationId, NEW_CHAT_TITLE, TEMPORARY_CHAT_TITLE,
};
pub use labels::{derive_title, relative_label, DEFAULT_TITLE_MAX_CHARS};
pub use message::{Message, Role};
pub use store::{ConversationStore, SharedStore};
