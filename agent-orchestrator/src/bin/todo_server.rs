//! Todo demo server binary

use agentflow::server::{create_router, DemoState};
use agentflow::ClientConfig;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting todo demo server v{}", env!("CARGO_PKG_VERSION"));

    // Optional config file as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(&path)
            .with_context(|| format!("Failed to load config file: {}", path))?,
        None => ClientConfig::default(),
    };

    let static_dir = config.todo.static_dir.clone();
    if !static_dir.join("index.html").exists() {
        warn!(static_dir = %static_dir.display(), "index.html missing, / will return 404");
    }

    let app = create_router(Arc::new(DemoState { static_dir }));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.todo.port));
    info!("Todo app running at http://localhost:{}", config.todo.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
