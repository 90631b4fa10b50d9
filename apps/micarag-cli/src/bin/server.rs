use std::sync::Arc;

use micarag_cli::{init_tracing, load_settings, server::router};
use micarag_pipeline::RagPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let settings = load_settings()?;
    let pipeline = Arc::new(RagPipeline::from_settings(&settings).await?);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!(addr = %settings.server_addr, "listening");
    axum::serve(listener, router(pipeline)).await?;
    Ok(())
}
