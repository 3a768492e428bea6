//! Response generation seams: the generator and the sink that receives streamed text.

use std::fmt::Display;
use std::future::Future;
use std::pin::pin;

use futures::{Stream, StreamExt};
use log::{debug, error, info, warn};

use crate::error::{CopilotError, Result};
use crate::types::{Generation, PromptRequest};

/// Persisted when generation is attempted without an API key.
pub const MISSING_API_KEY_MESSAGE: &str = "Error: GEMINI_API_KEY not set in environment variables";

/// Receives the cumulative text of a streamed reply after every increment.
pub trait ResponseSink: Send {
    fn receive(&mut self, cumulative_text: &str) -> impl Future<Output = Result<()>> + Send;
}

/// A language model that answers a prompt, one-shot or streamed.
///
/// Implementations never fail past this boundary: errors come back as
/// [`Generation::Failure`] carrying the text to persist.
pub trait ResponseGenerator: Send + Sync {
    fn generate(&self, request: &PromptRequest) -> impl Future<Output = Generation> + Send;

    fn generate_stream<K: ResponseSink>(
        &self,
        request: &PromptRequest,
        sink: &mut K,
    ) -> impl Future<Output = Generation> + Send;
}

pub fn failure_message(error: &impl Display) -> String {
    format!("Error generating response: {error}")
}

/// Feeds non-empty fragments into `sink` as a growing text.
///
/// A fragment error or a sink error ends the stream as a failure.
pub async fn drain_into_sink<St, K>(fragments: St, sink: &mut K) -> Generation
where
    St: Stream<Item = Result<String>> + Send,
    K: ResponseSink,
{
    let mut fragments = pin!(fragments);
    let mut text = String::new();
    let mut chunk_count = 0usize;

    while let Some(fragment) = fragments.next().await {
        let fragment = match fragment {
            Ok(fragment) => fragment,
            Err(e) => return fail_into_sink(&e, sink).await,
        };
        if fragment.is_empty() {
            continue;
        }

        chunk_count += 1;
        text.push_str(&fragment);
        debug!("Received chunk {chunk_count}: {} chars", fragment.len());

        if let Err(e) = sink.receive(&text).await {
            return fail_into_sink(&e, sink).await;
        }
    }

    info!("Completed streaming response with {chunk_count} chunks");
    Generation::Success(text)
}

/// Reports `error` to the sink as a final chunk and returns the failure.
pub async fn fail_into_sink<K: ResponseSink>(error: &CopilotError, sink: &mut K) -> Generation {
    error!("Error generating response: {error}");
    let message = failure_message(error);
    if let Err(e) = sink.receive(&message).await {
        warn!("Failed to deliver error text to sink: {e}");
    }
    Generation::Failure(message)
}


#[cfg(test)]
mod tests {
    use futures::stream;

    use super::testing::RecordingSink;
    use super::*;

    fn fragments(items: &[&str]) -> Vec<Result<String>> {
        items.iter().map(|s| Ok((*s).to_string())).collect()
    }

    #[tokio::test]
    async fn sink_receives_cumulative_text() {
        let mut sink = RecordingSink::default();
        let result = drain_into_sink(stream::iter(fragments(&["Hel", "lo", " world"])), &mut sink).await;

        assert_eq!(result, Generation::Success("Hello world".to_string()));
        assert_eq!(sink.received, vec!["Hel", "Hello", "Hello world"]);
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let mut sink = RecordingSink::default();
        let result = drain_into_sink(stream::iter(fragments(&["", "a", "", "b"])), &mut sink).await;

        assert_eq!(result, Generation::Success("ab".to_string()));
        assert_eq!(sink.received, vec!["a", "ab"]);
    }

    #[tokio::test]
    async fn stream_error_is_reported_as_final_chunk() {
        let mut sink = RecordingSink::default();
        let mut items = fragments(&["partial"]);
        items.push(Err(CopilotError::Stream("connection reset".to_string())));

        let result = drain_into_sink(stream::iter(items), &mut sink).await;

        let expected = "Error generating response: Event stream error: connection reset";
        assert_eq!(result, Generation::Failure(expected.to_string()));
        assert_eq!(sink.received, vec!["partial", expected]);
    }

    #[tokio::test]
    async fn sink_failure_ends_generation() {
        let mut sink = RecordingSink {
            fail_on: Some(2),
            ..Default::default()
        };
        let result = drain_into_sink(stream::iter(fragments(&["a", "b", "c"])), &mut sink).await;

        assert!(result.is_failure());
        assert!(result.text().contains("sink rejected chunk"));
        assert_eq!(sink.received.len(), 3);
        assert_eq!(sink.received[2], result.text());
    }
}
