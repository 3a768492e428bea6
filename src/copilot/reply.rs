//! Writes the assistant's reply record through its lifecycle.

use log::{debug, info};

use crate::error::Result;
use crate::generator::ResponseSink;
use crate::store::{FieldValue, Fields, MessageStore, WriteMode};
use crate::types::MessageRole;

/// Content of a reply that has been created but not yet streamed into.
const PLACEHOLDER_CONTENT: &str = "Thinking...";

/// Display name the assistant writes under.
const ASSISTANT_NAME: &str = "Copilot";

/// Reply record id owned by the given trigger message.
pub fn reply_id_for(trigger_id: &str) -> String {
    format!("{trigger_id}-copilot")
}

/// Handle on one reply record: created, updated per chunk, finalized once.
pub struct ReplyWriter<'a, S> {
    store: &'a S,
    chat_id: String,
    reply_id: String,
}

impl<'a, S: MessageStore> ReplyWriter<'a, S> {
    pub fn new(store: &'a S, chat_id: &str, reply_id: String) -> Self {
        Self {
            store,
            chat_id: chat_id.to_string(),
            reply_id,
        }
    }

    pub fn reply_id(&self) -> &str {
        &self.reply_id
    }

    /// Writes the `Thinking...` placeholder with a server creation time.
    pub async fn create(&self) -> Result<()> {
        debug!("Creating response message for chat {}", self.chat_id);
        let fields: Fields = vec![
            ("content", PLACEHOLDER_CONTENT.into()),
            ("role", MessageRole::Assistant.to_string().into()),
            ("username", ASSISTANT_NAME.into()),
            ("created_at", FieldValue::ServerTimestamp),
            ("is_streaming", true.into()),
        ];
        self.store
            .write_message(&self.chat_id, &self.reply_id, WriteMode::Set, &fields)
            .await?;
        info!("Created response message with ID: {}", self.reply_id);
        Ok(())
    }

    /// Replaces the content with the text streamed so far.
    pub async fn update(&self, content: &str) -> Result<()> {
        let fields: Fields = vec![
            ("content", content.into()),
            ("updated_at", FieldValue::ServerTimestamp),
        ];
        self.store
            .write_message(&self.chat_id, &self.reply_id, WriteMode::Update, &fields)
            .await
    }

    /// Writes the final content and clears the streaming flag.
    ///
    /// An error finalize overwrites the whole record and stamps `created_at`, since
    /// the failure may have happened before [`ReplyWriter::create`] ran.
    pub async fn finalize(&self, content: &str, is_error: bool) -> Result<()> {
        debug!(
            "Finalizing response {} with content length: {}",
            self.reply_id,
            content.len()
        );

        let mut fields: Fields = vec![
            ("content", content.into()),
            ("role", MessageRole::Assistant.to_string().into()),
            ("username", ASSISTANT_NAME.into()),
            ("updated_at", FieldValue::ServerTimestamp),
            ("is_streaming", false.into()),
        ];

        let mode = if is_error {
            fields.push(("created_at", FieldValue::ServerTimestamp));
            WriteMode::Set
        } else {
            WriteMode::Update
        };

        self.store
            .write_message(&self.chat_id, &self.reply_id, mode, &fields)
            .await?;
        info!("Response {} finalized successfully", self.reply_id);
        Ok(())
    }
}

impl<S: MessageStore> ResponseSink for ReplyWriter<'_, S> {
    async fn receive(&mut self, cumulative_text: &str) -> Result<()> {
        self.update(cumulative_text).await
    }
}
