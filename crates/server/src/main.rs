use std::sync::Arc;

use anyhow::Context;
use db::DBService;
use pyfluent_server::{AppState, config::Config, routes};
use services::services::{progress_store::SqliteProgressStore, sandbox::ProcessSandbox};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init();

    let config = Config::from_env()?;
    let db = DBService::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;

    let store = Arc::new(SqliteProgressStore::new(db));
    let sandbox = Arc::new(ProcessSandbox::new(
        config.sandbox_interpreter.clone(),
        config.sandbox_timeout,
    ));
    let state = AppState::new(store, sandbox);

    match state.provisioner().ensure().await {
        Ok(provisioned) => info!(
            inserted = provisioned.report.inserted,
            missions = provisioned.missions.len(),
            "Curriculum catalog ready"
        ),
        Err(e) => warn!("Catalog provisioning failed, will retry on first request: {}", e),
    }

    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "PyFluent server listening");

    axum::serve(listener, routes::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
