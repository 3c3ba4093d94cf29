//! The messaging synchronization engine.
//!
//! A [`Conversation`] is a live, self-synchronizing view over one message thread: an initial
//! snapshot from the record store, kept current by a change-feed subscription, with optimistic
//! local echo for the viewer's own sends. The echo and the feed are reconciled through the
//! `client_ref` correlation id, so a sent message appears exactly once no matter which path
//! lands first.

mod api;
mod conversation;
mod errors;

pub use api::MessagingApi;
pub use conversation::{ChatMessage, Conversation, ConversationKey};
pub use errors::MessagingError;
