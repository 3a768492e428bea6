//! Message store abstraction and its Firestore implementation.

mod document;
mod firestore;
#[cfg(test)]
pub(crate) mod memory;

use std::future::Future;

pub use document::Document;
pub use firestore::FirestoreClient;

use crate::error::Result;
use crate::types::ChatMessage;

/// A single field value in a message write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    Bool(bool),
    /// Resolved by the store to the time it applies the write.
    ServerTimestamp,
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// How a write treats the existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the whole document, creating it if absent.
    Set,
    /// Change only the listed fields; the document must already exist.
    Update,
}

/// Ordered field list for one write.
pub type Fields = Vec<(&'static str, FieldValue)>;

/// Storage backend for a chat's `messages` collection.
pub trait MessageStore: Send + Sync {
    /// Messages of `chat_id` ordered by `created_at`, newest first, at most `limit`.
    fn latest_messages(
        &self,
        chat_id: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ChatMessage>>> + Send;

    fn write_message(
        &self,
        chat_id: &str,
        message_id: &str,
        mode: WriteMode,
        fields: &Fields,
    ) -> impl Future<Output = Result<()>> + Send;
}
