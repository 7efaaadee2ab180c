use anyhow::Context;
use doc_chat_api::{router, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize environment variables and logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    if config.chat.api_key.is_some() {
        log::info!("Chat enabled with model {}", config.chat.model);
    } else {
        log::warn!("GOOGLE_API_KEY not set - /chat will answer 500 until it is configured");
    }

    let state = AppState::from_config(&config)?;
    let app = router(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
