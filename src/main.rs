#[tokio::main]
async fn main() -> copilot_trigger::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("copilot_trigger=info"),
    )
    .init();
    log::info!("Starting copilot trigger");

    match copilot_trigger::run().await {
        Ok(()) => {
            log::info!("Copilot trigger shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Copilot trigger encountered an error: {}", e);
            Err(e)
        }
    }
}
