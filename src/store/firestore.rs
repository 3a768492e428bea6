use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::config::FirestoreConfig;
use crate::error::{CopilotError, Result};
use crate::types::ChatMessage;

use super::document::{Document, encode_fields};
use super::{Fields, MessageStore, WriteMode};

const FIRESTORE_API_URL: &str = "https://firestore.googleapis.com/v1/";

// The emulator accepts this bearer token as an admin credential.
const EMULATOR_TOKEN: &str = "owner";

const CHATS_COLLECTION: &str = "chats";
const MESSAGES_COLLECTION: &str = "messages";
const ORDER_FIELD: &str = "created_at";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryRequest {
    structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredQuery {
    from: Vec<CollectionSelector>,
    order_by: Vec<Order>,
    limit: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: &'static str,
}

#[derive(Debug, Serialize)]
struct Order {
    field: FieldReference,
    direction: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference {
    field_path: &'static str,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Debug, Serialize)]
struct CommitRequest {
    writes: Vec<Write>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Write {
    update: DocumentWrite,
    #[serde(skip_serializing_if = "Option::is_none")]
    update_mask: Option<DocumentMask>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    update_transforms: Vec<FieldTransform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_document: Option<Precondition>,
}

#[derive(Debug, Serialize)]
struct DocumentWrite {
    name: String,
    fields: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentMask {
    field_paths: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldTransform {
    field_path: &'static str,
    set_to_server_value: &'static str,
}

#[derive(Debug, Serialize)]
struct Precondition {
    exists: bool,
}

/// Firestore REST v1 client scoped to one database.
pub struct FirestoreClient {
    client: reqwest::Client,
    base_url: Url,
    documents_path: String,
    access_token: Option<String>,
}

impl FirestoreClient {
    pub fn new(config: &FirestoreConfig) -> Result<Self> {
        let (base_url, access_token) = match &config.emulator_host {
            Some(host) => (
                Url::parse(&format!("http://{host}/v1/"))?,
                Some(EMULATOR_TOKEN.to_string()),
            ),
            None => (Url::parse(FIRESTORE_API_URL)?, config.access_token.clone()),
        };

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            documents_path: format!(
                "projects/{}/databases/{}/documents",
                config.project_id, config.database
            ),
            access_token,
        })
    }

    fn chat_path(&self, chat_id: &str) -> String {
        format!("{}/{CHATS_COLLECTION}/{chat_id}", self.documents_path)
    }

    fn message_name(&self, chat_id: &str, message_id: &str) -> String {
        format!(
            "{}/{MESSAGES_COLLECTION}/{message_id}",
            self.chat_path(chat_id)
        )
    }

    fn run_query_url(&self, chat_id: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("{}:runQuery", self.chat_path(chat_id)))?)
    }

    fn commit_url(&self) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("{}:commit", self.documents_path))?)
    }

    fn build_write(
        &self,
        chat_id: &str,
        message_id: &str,
        mode: WriteMode,
        fields: &Fields,
    ) -> Write {
        let (values, server_timestamps) = encode_fields(fields);

        // Transformed fields must stay out of the mask or they would be cleared first.
        let (update_mask, current_document) = match mode {
            WriteMode::Set => (None, None),
            WriteMode::Update => (
                Some(DocumentMask {
                    field_paths: values.keys().cloned().collect(),
                }),
                Some(Precondition { exists: true }),
            ),
        };

        Write {
            update: DocumentWrite {
                name: self.message_name(chat_id, message_id),
                fields: values,
            },
            update_mask,
            update_transforms: server_timestamps
                .into_iter()
                .map(|field_path| FieldTransform {
                    field_path,
                    set_to_server_value: "REQUEST_TIME",
                })
                .collect(),
            current_document,
        }
    }

    async fn post<T: Serialize>(&self, url: Url, body: &T) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(CopilotError::FirestoreApi { status, message });
        }

        Ok(response)
    }
}

fn messages_query(limit: usize) -> RunQueryRequest {
    RunQueryRequest {
        structured_query: StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: MESSAGES_COLLECTION,
            }],
            order_by: vec![Order {
                field: FieldReference {
                    field_path: ORDER_FIELD,
                },
                direction: "DESCENDING",
            }],
            limit: i32::try_from(limit).unwrap_or(i32::MAX),
        },
    }
}

impl MessageStore for FirestoreClient {
    async fn latest_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        debug!("Querying up to {limit} messages of chat {chat_id}");
        let response = self
            .post(self.run_query_url(chat_id)?, &messages_query(limit))
            .await?;

        let items: Vec<RunQueryItem> = response.json().await?;
        let messages: Vec<ChatMessage> = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(|doc| doc.to_message(chat_id))
            .collect();

        debug!("Query returned {} messages", messages.len());
        Ok(messages)
    }

    async fn write_message(
        &self,
        chat_id: &str,
        message_id: &str,
        mode: WriteMode,
        fields: &Fields,
    ) -> Result<()> {
        let request = CommitRequest {
            writes: vec![self.build_write(chat_id, message_id, mode, fields)],
        };

        self.post(self.commit_url()?, &request).await?;
        debug!("Committed {mode:?} of message {message_id} in chat {chat_id}");
        Ok(())
    }
}
