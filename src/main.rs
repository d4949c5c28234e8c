use anyhow::Context;
use docqa::{api, config, logging, processing::DocumentService};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::init_config().context("Failed to load config from environment")?;
    logging::init_tracing();

    let service = DocumentService::from_config(config)
        .await
        .context("Failed to initialize document service")?;
    let app = api::create_router(Arc::new(service), config.max_upload_bytes);

    let address = (config.server_host.as_str(), config.server_port);
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}:{}", address.0, address.1))?;
    tracing::info!(
        "Listening on http://{}",
        listener.local_addr().context("Listener has no local address")?
    );
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
