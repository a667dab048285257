use std::sync::Arc;

use cyberfolio_api::config::AppConfig;
use cyberfolio_api::gateway::RestGateway;
use cyberfolio_api::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL, SUPABASE_ANON_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    // Missing or placeholder backend settings are the one fatal error
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Starting Cyberfolio API in {:?} mode", config.environment);

    let gateway = Arc::new(RestGateway::new(&config.backend)?);
    let state = AppState::new(config, gateway);
    state.session.initialize().await;

    cyberfolio_api::serve(state).await
}
