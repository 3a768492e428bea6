//! Main handler for newly created chat messages.

use log::{debug, error, info, warn};

use crate::config::CopilotConfig;
use crate::error::Result;
use crate::generator::{ResponseGenerator, failure_message};
use crate::store::MessageStore;
use crate::trigger::{MessagePath, TriggerEvent};
use crate::types::{Generation, MessageRole};

use super::command::{extract_query, is_command, truncate_for_log};
use super::context::build_prompt;
use super::history::fetch_history;
use super::reply::{ReplyWriter, reply_id_for};

/// Clients built once at startup and shared by every invocation.
pub struct Services<S, G> {
    pub store: S,
    pub generator: G,
    pub config: CopilotConfig,
}

/// What an invocation did with its trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Not addressed to the assistant; nothing was written.
    Ignored,
    /// Reply finalized with generated text.
    Replied { reply_id: String },
    /// Reply finalized with an error message.
    Failed { reply_id: String },
}

/// Handles one document-created event.
///
/// Only a trigger without a usable document path, or a reply record that cannot
/// be finalized at all, comes back as an error.
pub async fn handle_new_message<S, G>(
    services: &Services<S, G>,
    event: &TriggerEvent,
) -> Result<Outcome>
where
    S: MessageStore,
    G: ResponseGenerator,
{
    info!("Function triggered for document: {}", event.document_name());
    let path = event.message_path()?;

    let content = event.content();
    debug!("Message content: {}", truncate_for_log(content));

    if event.role() == MessageRole::Assistant {
        debug!("Ignoring assistant message {}", path.message_id);
        return Ok(Outcome::Ignored);
    }
    if !is_command(content) {
        return Ok(Outcome::Ignored);
    }

    let query = extract_query(content);
    info!("Extracted query: {}", truncate_for_log(&query));

    let mut reply = ReplyWriter::new(
        &services.store,
        &path.chat_id,
        reply_id_for(&path.message_id),
    );

    let (final_content, is_error, failed) =
        match respond(services, &path, event.username(), &query, &mut reply).await {
            Ok(Generation::Success(text)) => (text, false, false),
            Ok(Generation::Failure(message)) => (message, false, true),
            Err(e) => {
                error!(
                    "Error answering message {} in chat {}: {e}",
                    path.message_id, path.chat_id
                );
                (failure_message(&e), true, true)
            }
        };

    match reply.finalize(&final_content, is_error).await {
        Err(e) if !is_error && e.is_not_found() => {
            warn!(
                "Reply {} disappeared before finalizing, rewriting it",
                reply.reply_id()
            );
            reply.finalize(&final_content, true).await?;
        }
        result => result?,
    }

    let reply_id = reply.reply_id().to_string();
    Ok(if failed {
        Outcome::Failed { reply_id }
    } else {
        Outcome::Replied { reply_id }
    })
}

async fn respond<S, G>(
    services: &Services<S, G>,
    path: &MessagePath,
    username: &str,
    query: &str,
    reply: &mut ReplyWriter<'_, S>,
) -> Result<Generation>
where
    S: MessageStore,
    G: ResponseGenerator,
{
    let config = &services.config;
    let history = fetch_history(
        &services.store,
        &path.chat_id,
        &path.message_id,
        config.history_limit,
    )
    .await;

    reply.create().await?;

    let request = build_prompt(config.context_strategy, &history, username, query);
    debug!("Prompt: {}", truncate_for_log(&request.prompt));

    let generation = if config.streaming {
        services.generator.generate_stream(&request, reply).await
    } else {
        services.generator.generate(&request).await
    };

    Ok(generation)
}
