//! Renders prior chat messages into model input.

use std::fmt::Write;

use crate::config::ContextStrategy;
use crate::types::{ChatMessage, PromptRequest, Turn, TurnRole};

/// Wraps each message in a tag named after its sender.
///
/// ```text
/// <conversation>
/// <alice>hi</alice>
/// <Copilot>hello</Copilot>
/// </conversation>
/// ```
fn format_tagged(messages: &[ChatMessage]) -> String {
    let mut context = String::from("<conversation>\n");
    for message in messages {
        let _ = writeln!(
            context,
            "<{name}>{content}</{name}>",
            name = message.username,
            content = message.content
        );
    }
    context.push_str("</conversation>");
    context
}

/// `[sender:Name] content` marker used by the structured strategy.
pub fn sender_line(username: &str, content: &str) -> String {
    format!("[sender:{username}] {content}")
}

/// Converts messages to history turns, starting with a user turn as Gemini requires.
pub fn format_sender_history(messages: &[ChatMessage]) -> Vec<Turn> {
    let mut turns: Vec<Turn> = messages
        .iter()
        .map(|message| Turn {
            role: message.role.into(),
            text: sender_line(&message.username, &message.content),
        })
        .collect();

    if turns.first().is_some_and(|turn| turn.role != TurnRole::User) {
        turns.insert(0, Turn::user(""));
    }

    turns
}

/// Assembles prompt and history for the configured strategy.
pub fn build_prompt(
    strategy: ContextStrategy,
    history: &[ChatMessage],
    username: &str,
    query: &str,
) -> PromptRequest {
    match strategy {
        ContextStrategy::Tagged => PromptRequest {
            prompt: format!("{}\n\n I'm {username}. {query}", format_tagged(history)),
            history: Vec::new(),
        },
        ContextStrategy::Sender => PromptRequest {
            prompt: sender_line(username, query),
            history: format_sender_history(history),
        },
    }
}
