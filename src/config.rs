use std::env;

use log::{debug, error, info};
use strum::{Display, EnumString};

use crate::error::{CopilotError, Result};

const DEFAULT_REGION: &str = "asia-southeast1";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_DATABASE: &str = "(default)";
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// System instruction sent with every chat session unless `SYSTEM_PROMPT` overrides it.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"
You are a helpful facilitator for a chat application.
Your role is to assist users by providing relevant information and answering their questions.
You should maintain a friendly and professional tone, and ensure that your responses are clear and concise.
If you do not know the answer to a question, it is better to say "I don't know" than to provide incorrect information.

This is a multi-user chat application. You'll be given a conversation history formatted as [sender:User] <message> or [sender:Copilot] <message>.
When responding, you should only include the content of your message. Do not include the [sender:User] or [sender:Copilot] tags.

This is a simple chat messaging. You don't need to write messages in a markdown format.
"#;

/// How prior messages are presented to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContextStrategy {
    /// One `<conversation>` block with sender-named tags, prepended to the prompt.
    #[default]
    Tagged,
    /// Structured history turns prefixed with `[sender:Name]`.
    Sender,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub emulator_host: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CopilotConfig {
    pub context_strategy: ContextStrategy,
    pub history_limit: usize,
    pub streaming: bool,
}

impl Default for CopilotConfig {
    fn default() -> Self {
        Self {
            context_strategy: ContextStrategy::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            streaming: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    pub gemini: GeminiConfig,
    pub firestore: FirestoreConfig,
    pub copilot: CopilotConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        debug!("Loading configuration from environment");
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok().filter(|value| !value.is_empty()))
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let region = lookup("REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());

        let api_key = lookup("GEMINI_API_KEY");
        let model = lookup("GEMINI_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let system_prompt =
            lookup("SYSTEM_PROMPT").unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        let project_id = lookup("GOOGLE_CLOUD_PROJECT")
            .or_else(|| lookup("GCLOUD_PROJECT"))
            .ok_or_else(|| {
                error!("Failed to load GOOGLE_CLOUD_PROJECT from environment");
                CopilotError::Config(
                    "GOOGLE_CLOUD_PROJECT or GCLOUD_PROJECT must be set".to_string(),
                )
            })?;
        let database = lookup("FIRESTORE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let emulator_host = lookup("FIRESTORE_EMULATOR_HOST");
        let access_token = lookup("GOOGLE_OAUTH_ACCESS_TOKEN");

        let context_strategy = match lookup("COPILOT_CONTEXT_MODE") {
            Some(raw) => raw.parse::<ContextStrategy>().map_err(|e| {
                error!("Invalid COPILOT_CONTEXT_MODE '{raw}': {e}");
                CopilotError::Config(format!(
                    "COPILOT_CONTEXT_MODE must be 'tagged' or 'sender', got '{raw}'"
                ))
            })?,
            None => ContextStrategy::default(),
        };

        let history_limit = match lookup("COPILOT_HISTORY_LIMIT") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                error!("Invalid COPILOT_HISTORY_LIMIT '{raw}': {e}");
                CopilotError::Config(format!("COPILOT_HISTORY_LIMIT must be a number: {e}"))
            })?,
            None => DEFAULT_HISTORY_LIMIT,
        };

        let streaming = match lookup("COPILOT_STREAMING") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                CopilotError::Config(format!("COPILOT_STREAMING must be a boolean, got '{raw}'"))
            })?,
            None => true,
        };

        info!("Configuration loaded successfully");
        debug!("Region: {region}");
        match &api_key {
            Some(key) => debug!("Gemini API key length: {} characters", key.len()),
            None => debug!("Gemini API key not set"),
        }
        debug!("Gemini model: {model}");
        debug!("System prompt length: {} characters", system_prompt.len());
        debug!("Firestore project: {project_id}, database: {database}");
        if let Some(ref host) = emulator_host {
            debug!("Using Firestore emulator at {host}");
        }
        debug!(
            "Context strategy: {context_strategy}, history limit: {history_limit}, streaming: {streaming}"
        );

        Ok(Self {
            region,
            gemini: GeminiConfig {
                api_key,
                model,
                system_prompt,
            },
            firestore: FirestoreConfig {
                project_id,
                database,
                emulator_host,
                access_token,
            },
            copilot: CopilotConfig {
                context_strategy,
                history_limit,
                streaming,
            },
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
