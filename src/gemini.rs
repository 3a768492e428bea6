use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::GeminiConfig;
use crate::copilot::truncate_for_log;
use crate::error::{CopilotError, Result};
use crate::generator::{
    MISSING_API_KEY_MESSAGE, ResponseGenerator, ResponseSink, drain_into_sink, fail_into_sink,
    failure_message,
};
use crate::types::{Generation, PromptRequest, TurnRole};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<TurnRole>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<TurnRole>, text: &str) -> Self {
        Self {
            role,
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

/// Error object Gemini sends in place of a chunk when a stream breaks off.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate; empty when the payload carries none.
    fn text(&self) -> Result<String> {
        if let Some(error) = &self.error {
            return Err(CopilotError::GeminiApi {
                status: reqwest::StatusCode::from_u16(error.code)
                    .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
                message: error.message.clone(),
            });
        }

        if self.candidates.is_empty()
            && let Some(reason) = self
                .prompt_feedback
                .as_ref()
                .and_then(|feedback| feedback.block_reason.as_deref())
        {
            return Err(CopilotError::GeminiResponse(format!(
                "Prompt blocked: {reason}"
            )));
        }

        Ok(self
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}

/// Gemini REST client holding one model and system instruction.
pub struct GeminiClient {
    api_key: Option<String>,
    client: reqwest::Client,
    base_url: Url,
    model: String,
    system_prompt: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.is_none() {
            warn!("GEMINI_API_KEY not set in environment variables");
        }

        Ok(Self {
            api_key: config.api_key.clone(),
            client: reqwest::Client::new(),
            base_url: Url::parse(GEMINI_API_URL)?,
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn endpoint(&self, method: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("models/{}:{method}", self.model))?)
    }

    fn build_request(&self, request: &PromptRequest) -> GenerateContentRequest {
        let mut contents: Vec<Content> = request
            .history
            .iter()
            .map(|turn| Content::text(Some(turn.role), &turn.text))
            .collect();
        contents.push(Content::text(Some(TurnRole::User), &request.prompt));

        GenerateContentRequest {
            system_instruction: Content::text(None, &self.system_prompt),
            contents,
        }
    }

    async fn send(
        &self,
        api_key: &str,
        url: Url,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::Response> {
        debug!(
            "Sending request to Gemini model {} with {} contents",
            self.model,
            body.contents.len()
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
            return Err(CopilotError::GeminiApi { status, message });
        }

        Ok(response)
    }

    async fn generate_content(&self, api_key: &str, request: &PromptRequest) -> Result<String> {
        let body = self.build_request(request);
        let response = self
            .send(api_key, self.endpoint("generateContent")?, &body)
            .await?;

        let api_response: GenerateContentResponse = response.json().await?;
        if api_response.candidates.is_empty()
            && api_response.prompt_feedback.is_none()
            && api_response.error.is_none()
        {
            return Err(CopilotError::GeminiResponse(
                "No candidates in response".to_string(),
            ));
        }
        api_response.text()
    }

    async fn open_stream(
        &self,
        api_key: &str,
        request: &PromptRequest,
    ) -> Result<impl Stream<Item = Result<String>> + Send> {
        let body = self.build_request(request);
        let mut url = self.endpoint("streamGenerateContent")?;
        url.query_pairs_mut().append_pair("alt", "sse");

        let response = self.send(api_key, url, &body).await?;

        Ok(response.bytes_stream().eventsource().map(|event| {
            let event = event.map_err(|e| CopilotError::Stream(e.to_string()))?;
            parse_stream_chunk(&event.data)
        }))
    }
}

/// Text carried by one SSE `data:` payload of a streamed response.
fn parse_stream_chunk(data: &str) -> Result<String> {
    let chunk: GenerateContentResponse = serde_json::from_str(data)?;
    chunk.text()
}

impl ResponseGenerator for GeminiClient {
    async fn generate(&self, request: &PromptRequest) -> Generation {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("GEMINI_API_KEY not set in environment variables");
            return Generation::Failure(MISSING_API_KEY_MESSAGE.to_string());
        };

        info!(
            "Generating response with {} for prompt: {}",
            self.model,
            truncate_for_log(&request.prompt)
        );

        match self.generate_content(api_key, request).await {
            Ok(text) => {
                info!("Received complete response: {} chars", text.len());
                Generation::Success(text)
            }
            Err(e) => {
                error!("Error generating response: {e}");
                Generation::Failure(failure_message(&e))
            }
        }
    }

    async fn generate_stream<K: ResponseSink>(
        &self,
        request: &PromptRequest,
        sink: &mut K,
    ) -> Generation {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("GEMINI_API_KEY not set in environment variables");
            return Generation::Failure(MISSING_API_KEY_MESSAGE.to_string());
        };

        info!(
            "Streaming response with {} for prompt: {}",
            self.model,
            truncate_for_log(&request.prompt)
        );

        match self.open_stream(api_key, request).await {
            Ok(fragments) => drain_into_sink(fragments, sink).await,
            Err(e) => fail_into_sink(&e, sink).await,
        }
    }
}
