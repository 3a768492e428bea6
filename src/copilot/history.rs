//! Conversation history retrieval from the chat's message collection.

use log::{debug, warn};

use crate::store::MessageStore;
use crate::types::ChatMessage;

use super::command::truncate_for_log;

/// Fetches up to `limit` recent messages of the chat, minus the trigger, oldest first.
///
/// Retrieval failures degrade to an empty history.
pub async fn fetch_history<S: MessageStore>(
    store: &S,
    chat_id: &str,
    trigger_id: &str,
    limit: usize,
) -> Vec<ChatMessage> {
    debug!("Retrieving previous messages for chat {chat_id}, excluding message {trigger_id}");

    let mut messages = match store.latest_messages(chat_id, limit).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!("Failed to retrieve previous messages for chat {chat_id}: {e}");
            return Vec::new();
        }
    };

    // The trigger is normally the newest entry; drop it by id when we can see it.
    match messages.iter().position(|message| message.id == trigger_id) {
        Some(index) => {
            messages.remove(index);
        }
        None if !messages.is_empty() => {
            messages.remove(0);
        }
        None => {}
    }

    messages.reverse();

    debug!("Retrieved {} previous messages", messages.len());
    for message in &messages {
        debug!(
            "History [{}] {}: {}",
            message.role,
            message.username,
            truncate_for_log(&message.content)
        );
    }

    messages
}
