use bill_server::core::{Config, Server, ServerState};
use bill_server::{print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_environment()?;
    print_banner();

    tracing::info!("Starting bill server...");

    let config = Config::from_env();
    let state = ServerState::initialize(&config).await?;

    if let Err(e) = Server::with_state(config, state).run().await {
        tracing::error!("Server error: {e}");
        return Err(e);
    }

    Ok(())
}
