use anyhow::Result;
use std::sync::Arc;

use story_sheets::{app, config, logging, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::Config::from_env()?;
    let addr = config.addr;

    // Build our application state
    let state = Arc::new(AppState::new(config));
    tracing::info!(
        "AI providers configured: {:?}, default: {}",
        state.generators.providers(),
        state.generators.default_provider()
    );

    let app = app(state);

    // Run it
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
