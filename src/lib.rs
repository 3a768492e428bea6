pub mod config;
pub mod copilot;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod store;
pub mod trigger;
pub mod types;

use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use config::Config;
use copilot::{Outcome, Services, handle_new_message};
use error::Result;
use gemini::GeminiClient;
use generator::ResponseGenerator;
use store::{FirestoreClient, MessageStore};
use trigger::TriggerEvent;

/// Run the trigger: build clients once, then handle events read from stdin, one JSON event per line.
pub async fn run() -> Result<()> {
    info!("Initializing copilot trigger");
    let config = Config::from_env()?;
    info!("Function configured for region: {}", config.region);

    debug!("Initializing Firestore client");
    let store = FirestoreClient::new(&config.firestore)?;

    debug!("Initializing Gemini client");
    let generator = GeminiClient::new(&config.gemini)?;

    let services = Services {
        store,
        generator,
        config: config.copilot,
    };

    info!("Waiting for trigger events");
    serve(&services, BufReader::new(tokio::io::stdin())).await
}

/// Handles newline-delimited events from `input` until it closes or Ctrl-C.
///
/// A line that is not UTF-8 or not a valid event is logged and skipped.
async fn serve<S, G, R>(services: &Services<S, G>, mut input: R) -> Result<()>
where
    S: MessageStore,
    G: ResponseGenerator,
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    loop {
        tokio::select! {
            read = input.read_until(b'\n', &mut buf) => {
                if read? == 0 {
                    info!("Event input closed");
                    break;
                }
                match std::str::from_utf8(&buf) {
                    Ok(line) => process_event(services, line).await,
                    Err(e) => error!("Skipping unreadable trigger event: {e}"),
                }
                buf.clear();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, shutting down...");
                break;
            }
        }
    }

    Ok(())
}

async fn process_event<S, G>(services: &Services<S, G>, line: &str)
where
    S: MessageStore,
    G: ResponseGenerator,
{
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let event = match TriggerEvent::from_json(line) {
        Ok(event) => event,
        Err(e) => {
            error!("Skipping malformed trigger event: {e}");
            return;
        }
    };

    match handle_new_message(services, &event).await {
        Ok(Outcome::Ignored) => debug!("No reply needed for {}", event.document_name()),
        Ok(Outcome::Replied { reply_id }) => info!("Replied with message {reply_id}"),
        Ok(Outcome::Failed { reply_id }) => warn!("Reply {reply_id} finalized with an error"),
        Err(e) => error!("Failed to handle {}: {e}", event.document_name()),
    }
}
