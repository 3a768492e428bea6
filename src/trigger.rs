//! Document-created trigger events.

use serde::Deserialize;

use crate::error::{CopilotError, Result};
use crate::store::Document;
use crate::types::MessageRole;

/// Payload of a Firestore `document.created` event in its JSON form.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerEvent {
    pub value: Document,
}

/// Identifiers taken from `chats/{chat_id}/messages/{message_id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePath {
    pub chat_id: String,
    pub message_id: String,
}

impl TriggerEvent {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn document_name(&self) -> &str {
        &self.value.name
    }

    pub fn message_path(&self) -> Result<MessagePath> {
        parse_message_path(&self.value.name)
    }

    pub fn username(&self) -> &str {
        self.value.string_field("username").unwrap_or_default()
    }

    pub fn content(&self) -> &str {
        self.value.string_field("content").unwrap_or_default()
    }

    pub fn role(&self) -> MessageRole {
        self.value
            .string_field("role")
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}

/// Accepts both full resource names and collection-relative paths, for the
/// top-level `chats` collection only.
pub fn parse_message_path(name: &str) -> Result<MessagePath> {
    let segments: Vec<&str> = name.trim_matches('/').split('/').collect();

    match segments.as_slice() {
        ["projects", _, "databases", _, "documents", "chats", chat_id, "messages", message_id]
        | ["chats", chat_id, "messages", message_id]
            if !chat_id.is_empty() && !message_id.is_empty() =>
        {
            Ok(MessagePath {
                chat_id: (*chat_id).to_string(),
                message_id: (*message_id).to_string(),
            })
        }
        _ => Err(CopilotError::InvalidTrigger(format!(
            "document '{name}' is not in chats/{{chatId}}/messages/{{messageId}}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_resource_name() {
        let path = parse_message_path(
            "projects/demo/databases/(default)/documents/chats/c1/messages/m1",
        )
        .unwrap();
        assert_eq!(
            path,
            MessagePath {
                chat_id: "c1".to_string(),
                message_id: "m1".to_string()
            }
        );
    }

    #[test]
    fn parses_relative_path() {
        let path = parse_message_path("chats/c1/messages/m1").unwrap();
        assert_eq!(path.chat_id, "c1");
        assert_eq!(path.message_id, "m1");
    }

    #[test]
    fn rejects_other_collections() {
        assert!(parse_message_path("chats/c1").is_err());
        assert!(parse_message_path("users/u1/messages/m1").is_err());
        assert!(parse_message_path("chats/c1/messages/m1/reactions/r1").is_err());
    }

    #[test]
    fn rejects_nested_chat_collections() {
        assert!(parse_message_path("users/u1/chats/c1/messages/m1").is_err());
        assert!(
            parse_message_path(
                "projects/demo/databases/(default)/documents/users/u1/chats/c1/messages/m1"
            )
            .is_err()
        );
    }

    #[test]
    fn reads_payload_fields() {
        let event = TriggerEvent::from_json(
            r#"{"value": {
                "name": "projects/demo/databases/(default)/documents/chats/c1/messages/m1",
                "fields": {
                    "username": {"stringValue": "alice"},
                    "content": {"stringValue": "@copilot hi"}
                }
            }}"#,
        )
        .unwrap();

        assert_eq!(event.username(), "alice");
        assert_eq!(event.content(), "@copilot hi");
        assert_eq!(event.role(), MessageRole::User);
        assert_eq!(event.message_path().unwrap().message_id, "m1");
    }

    #[test]
    fn missing_payload_fields_are_empty() {
        let event = TriggerEvent::from_json(r#"{"value": {"name": "chats/c1/messages/m1"}}"#).unwrap();
        assert_eq!(event.username(), "");
        assert_eq!(event.content(), "");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            TriggerEvent::from_json("{not json"),
            Err(CopilotError::Json(_))
        ));
    }
}
