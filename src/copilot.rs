//! `@copilot` assistant - answers chat messages that address it.

mod command;
mod context;
mod handler;
mod history;
mod reply;

pub use command::{extract_query, is_command, truncate_for_log};
pub use context::{build_prompt, format_sender_history};
pub use handler::{Outcome, Services, handle_new_message};
pub use history::fetch_history;
pub use reply::{ReplyWriter, reply_id_for};
