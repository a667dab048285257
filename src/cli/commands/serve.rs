use clap::Args;

use crate::cli::config::CliContext;
use crate::state::AppState;

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, help = "Serve from an in-process store instead of the hosted backend")]
    pub memory: bool,

    #[arg(long, help = "Port to listen on (overrides CYBERFOLIO_PORT / PORT)")]
    pub port: Option<u16>,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut ctx = if args.memory {
        CliContext::in_memory().await?
    } else {
        CliContext::from_env()?
    };
    if let Some(port) = args.port {
        ctx.config.server.port = port;
    }

    tracing::info!(
        "Starting Cyberfolio API in {:?} mode ({} store)",
        ctx.config.environment,
        if args.memory { "in-memory" } else { "hosted" }
    );

    let state = AppState::new(ctx.config, ctx.gateway);
    state.session.initialize().await;
    crate::serve(state).await
}
