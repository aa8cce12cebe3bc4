use print_server::{Server, ServerState, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // 1. .env, configuration, logging
    let config = setup_environment()?;

    tracing::info!(
        "Print server starting (env: {}, store: {:?})",
        config.environment,
        config.print_store
    );

    // 2. Job store and renderer
    let state = ServerState::initialize(&config).await?;

    // 3. HTTP until Ctrl-C
    let server = Server::with_state(config, state);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
