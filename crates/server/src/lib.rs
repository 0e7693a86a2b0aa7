pub mod errors;
pub mod handlers;
pub mod router;
pub mod state;
pub mod types;

pub use argo_rag::config;

use crate::{
    config::{get_config, AppConfig},
    router::create_router,
    state::build_app_state,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

/// Serves the question endpoints on `listener` until the process stops.
///
/// Opens the observation database and the vector store once, before the first
/// request; a store that cannot be opened fails here instead of on a query.
pub async fn run(listener: TcpListener, config: AppConfig) -> anyhow::Result<()> {
    debug!(?config, "Server configuration loaded");

    let app_state = build_app_state(config).await?;
    let allowed_origins = app_state.config.cors_origins().len();
    let app = create_router(app_state);

    info!(
        allowed_origins,
        "ARGO RAG server listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;

    Ok(())
}

/// Binary entry point: reads `.env`, logs through `RUST_LOG`, loads `config.yml`
/// and the environment, then listens on `0.0.0.0:PORT`.
pub async fn start() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = get_config(None)?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    run(listener, config).await
}
