//! Firestore REST document representation.
//!
//! Field values use the typed JSON encoding of the v1 API
//! (`{"stringValue": "..."}`, `{"booleanValue": true}`, `{"timestampValue": "..."}`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::types::{ChatMessage, MessageRole};

use super::FieldValue;

const DEFAULT_USERNAME: &str = "User";

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Document {
    /// Last path segment of the resource name.
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn string_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.get("stringValue")?.as_str()
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.fields.get(key)?.get("booleanValue")?.as_bool()
    }

    pub fn timestamp_field(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.fields.get(key)?.get("timestampValue")?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Decodes a message document, defaulting any missing field.
    pub fn to_message(&self, chat_id: &str) -> ChatMessage {
        let role = self
            .string_field("role")
            .and_then(|raw| raw.parse::<MessageRole>().ok())
            .unwrap_or_default();

        ChatMessage {
            id: self.id().to_string(),
            chat_id: chat_id.to_string(),
            username: self
                .string_field("username")
                .unwrap_or(DEFAULT_USERNAME)
                .to_string(),
            content: self.string_field("content").unwrap_or_default().to_string(),
            role,
            created_at: self.timestamp_field("created_at"),
            is_streaming: self.bool_field("is_streaming").unwrap_or(false),
            updated_at: self.timestamp_field("updated_at"),
        }
    }
}

/// Splits a field list into encoded values and server-timestamp transforms.
pub(super) fn encode_fields(
    fields: &[(&'static str, FieldValue)],
) -> (Map<String, Value>, Vec<&'static str>) {
    let mut values = Map::new();
    let mut server_timestamps = Vec::new();

    for (key, value) in fields {
        match value {
            FieldValue::String(text) => {
                values.insert((*key).to_string(), json!({ "stringValue": text }));
            }
            FieldValue::Bool(flag) => {
                values.insert((*key).to_string(), json!({ "booleanValue": flag }));
            }
            FieldValue::ServerTimestamp => server_timestamps.push(*key),
        }
    }

    (values, server_timestamps)
}
