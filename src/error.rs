use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopilotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Firestore API error ({status}): {message}")]
    FirestoreApi {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Gemini API error ({status}): {message}")]
    GeminiApi {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Gemini response error: {0}")]
    GeminiResponse(String),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event stream error: {0}")]
    Stream(String),

    #[error("Invalid trigger event: {0}")]
    InvalidTrigger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CopilotError {
    /// Whether the store reported that the target document does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CopilotError::FirestoreApi { status, .. } if *status == reqwest::StatusCode::NOT_FOUND
        )
    }
}

pub type Result<T> = std::result::Result<T, CopilotError>;
