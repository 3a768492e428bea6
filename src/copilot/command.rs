//! `@copilot` command detection.

/// Marker that addresses the assistant inside a chat message.
const COMMAND_MARKER: &str = "@copilot";

const LOG_PREVIEW_CHARS: usize = 100;

/// Returns true when the message addresses the assistant.
pub fn is_command(content: &str) -> bool {
    content.contains(COMMAND_MARKER)
}

/// Removes the marker and trims the remaining text.
pub fn extract_query(content: &str) -> String {
    content.replace(COMMAND_MARKER, "").trim().to_string()
}

/// Shortens text for log lines, cutting on a char boundary.
pub fn truncate_for_log(text: &str) -> String {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
