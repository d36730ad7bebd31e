#[cfg(feature = "http_api")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    use std::sync::Arc;

    use bar_roster::{GeminiGenerator, RosterConfig, http_api, telemetry};

    let config = RosterConfig::from_env()?;
    telemetry::init_tracing(config.log_json, "info,bar_roster=debug");

    if config.llm.api_key.is_none() {
        tracing::warn!("no GEMINI_API_KEY set; schedule generation requests will fail");
    }
    let store = Arc::from(config.open_store()?);
    let generator = GeminiGenerator::new(config.llm.clone())?;

    println!("bar-roster HTTP API listening on http://{}", config.http_addr);
    http_api::serve(config.http_addr, http_api::AppState::new(store, generator)).await?;
    Ok(())
}

#[cfg(not(feature = "http_api"))]
fn main() {
    eprintln!("Rebuild with the `http_api` feature to enable the HTTP server.");
}
