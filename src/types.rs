//! Common types used throughout the copilot trigger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Author role stored on a chat message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MessageRole {
    /// Message written by a chat participant
    #[default]
    User,
    /// Message written by the assistant
    Assistant,
}

/// A message document from a chat's `messages` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub chat_id: String,
    pub username: String,
    pub content: String,
    pub role: MessageRole,
    pub created_at: Option<DateTime<Utc>>,
    pub is_streaming: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Role of a turn in the model's conversation history.
///
/// Maps to Gemini `contents[].role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl From<MessageRole> for TurnRole {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::Assistant => TurnRole::Model,
            MessageRole::User => TurnRole::User,
        }
    }
}

/// One prior turn sent to the model as structured history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }
}

/// Everything the generator needs for one reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptRequest {
    pub prompt: String,
    pub history: Vec<Turn>,
}

/// Outcome of a generation call.
///
/// A failure carries the exact text that gets persisted as the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Success(String),
    Failure(String),
}

#[cfg(test)]
impl Generation {
    pub fn text(&self) -> &str {
        match self {
            Generation::Success(text) | Generation::Failure(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Generation::Failure(_))
    }
}
