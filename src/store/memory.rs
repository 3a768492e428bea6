//! In-memory message store used by tests.
//!
//! Server timestamps come from a logical clock that advances one millisecond per
//! write, so ordering by `created_at` is deterministic.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::error::{CopilotError, Result};
use crate::types::{ChatMessage, MessageRole};

use super::{FieldValue, Fields, MessageStore, WriteMode};

#[derive(Debug, Clone)]
enum Stored {
    String(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Default)]
struct State {
    ticks: i64,
    docs: HashMap<(String, String), HashMap<String, Stored>>,
    writes: Vec<(String, WriteMode, Option<String>)>,
    fail_queries: bool,
    failing_writes: usize,
    dropping_sets: bool,
}

impl State {
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        let epoch = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_default();
        epoch + Duration::milliseconds(self.ticks)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a participant message with the next server timestamp.
    pub fn add_user_message(&self, chat_id: &str, message_id: &str, username: &str, content: &str) {
        let mut state = self.state.lock().unwrap();
        let created_at = state.now();
        let doc = HashMap::from([
            ("username".to_string(), Stored::String(username.to_string())),
            ("content".to_string(), Stored::String(content.to_string())),
            ("role".to_string(), Stored::String("user".to_string())),
            ("created_at".to_string(), Stored::Timestamp(created_at)),
        ]);
        state
            .docs
            .insert((chat_id.to_string(), message_id.to_string()), doc);
    }

    pub fn message(&self, chat_id: &str, message_id: &str) -> Option<ChatMessage> {
        let state = self.state.lock().unwrap();
        state
            .docs
            .get(&(chat_id.to_string(), message_id.to_string()))
            .map(|doc| decode(chat_id, message_id, doc))
    }

    pub fn message_count(&self, chat_id: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.docs.keys().filter(|(chat, _)| chat == chat_id).count()
    }

    /// Content written to `message_id` by each write, in order.
    pub fn content_history(&self, message_id: &str) -> Vec<Option<String>> {
        let state = self.state.lock().unwrap();
        state
            .writes
            .iter()
            .filter(|(id, _, _)| id == message_id)
            .map(|(_, _, content)| content.clone())
            .collect()
    }

    pub fn write_modes(&self, message_id: &str) -> Vec<WriteMode> {
        let state = self.state.lock().unwrap();
        state
            .writes
            .iter()
            .filter(|(id, _, _)| id == message_id)
            .map(|(_, mode, _)| *mode)
            .collect()
    }

    pub fn fail_queries(&self) {
        self.state.lock().unwrap().fail_queries = true;
    }

    /// Rejects the next `count` writes.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().unwrap().failing_writes = count;
    }

    /// Acknowledges the next `Set` without keeping the document, as if it
    /// were deleted right after being written.
    pub fn drop_next_set(&self) {
        self.state.lock().unwrap().dropping_sets = true;
    }
}

fn decode(chat_id: &str, message_id: &str, doc: &HashMap<String, Stored>) -> ChatMessage {
    let string = |key: &str| match doc.get(key) {
        Some(Stored::String(value)) => Some(value.clone()),
        _ => None,
    };
    let timestamp = |key: &str| match doc.get(key) {
        Some(Stored::Timestamp(value)) => Some(*value),
        _ => None,
    };

    ChatMessage {
        id: message_id.to_string(),
        chat_id: chat_id.to_string(),
        username: string("username").unwrap_or_else(|| "User".to_string()),
        content: string("content").unwrap_or_default(),
        role: string("role")
            .and_then(|raw| raw.parse::<MessageRole>().ok())
            .unwrap_or_default(),
        created_at: timestamp("created_at"),
        is_streaming: matches!(doc.get("is_streaming"), Some(Stored::Bool(true))),
        updated_at: timestamp("updated_at"),
    }
}

impl MessageStore for MemoryStore {
    async fn latest_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let state = self.state.lock().unwrap();
        if state.fail_queries {
            return Err(CopilotError::FirestoreApi {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                message: "query unavailable".to_string(),
            });
        }

        let mut messages: Vec<ChatMessage> = state
            .docs
            .iter()
            .filter(|((chat, _), _)| chat == chat_id)
            .map(|((chat, id), doc)| decode(chat, id, doc))
            .filter(|message| message.created_at.is_some())
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        messages.truncate(limit);
        Ok(messages)
    }

    async fn write_message(
        &self,
        chat_id: &str,
        message_id: &str,
        mode: WriteMode,
        fields: &Fields,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(CopilotError::FirestoreApi {
                status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                message: "write rejected".to_string(),
            });
        }

        let key = (chat_id.to_string(), message_id.to_string());
        if mode == WriteMode::Update && !state.docs.contains_key(&key) {
            return Err(CopilotError::FirestoreApi {
                status: reqwest::StatusCode::NOT_FOUND,
                message: format!("No document to update: {message_id}"),
            });
        }

        let now = state.now();
        let mut resolved = HashMap::new();
        let mut content = None;
        for (field, value) in fields {
            let stored = match value {
                FieldValue::String(text) => {
                    if *field == "content" {
                        content = Some(text.clone());
                    }
                    Stored::String(text.clone())
                }
                FieldValue::Bool(flag) => Stored::Bool(*flag),
                FieldValue::ServerTimestamp => Stored::Timestamp(now),
            };
            resolved.insert((*field).to_string(), stored);
        }

        match mode {
            WriteMode::Set if state.dropping_sets => {
                state.dropping_sets = false;
            }
            WriteMode::Set => {
                state.docs.insert(key, resolved);
            }
            WriteMode::Update => {
                if let Some(doc) = state.docs.get_mut(&key) {
                    doc.extend(resolved);
                }
            }
        }
        state
            .writes
            .push((message_id.to_string(), mode, content));
        Ok(())
    }
}
