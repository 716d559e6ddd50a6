//! # fluxhubd — fluxhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the tracing subscriber
//! - Open the configured persistence hook (none, memory, or `SQLite`)
//! - Build the device registry for the configured lifecycle policy
//! - Build the axum router, injecting the device service
//! - Optionally run the interactive console on stdin
//! - Bind to a TCP port and serve until Ctrl-C or console `exit`, then stop
//!   every device
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod logging;
mod shell;

use std::sync::Arc;

use tokio::sync::oneshot;

use fluxhub_adapter_http_axum::state::AppState;
use fluxhub_adapter_storage_sqlite_sqlx::pool;
use fluxhub_adapter_storage_sqlite_sqlx::state_store::SqliteDeviceStateStore;
use fluxhub_app::ports::DeviceStateStore;
use fluxhub_app::registry::Registry;
use fluxhub_app::services::device_service::DeviceService;
use fluxhub_app::state_store::{InMemoryStateStore, NoopStateStore};

use crate::config::{Config, StorageBackend};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    logging::init(&config.logging.filter)?;

    tracing::info!(
        policy = %config.registry.policy,
        storage = %config.storage.backend,
        "starting fluxhubd"
    );

    match config.storage.backend {
        StorageBackend::None => serve(config, Arc::new(NoopStateStore)).await,
        StorageBackend::Memory => serve(config, Arc::new(InMemoryStateStore::new())).await,
        StorageBackend::Sqlite => {
            let db = pool::Config {
                database_url: config.storage.url.clone(),
            }
            .build()
            .await?;
            let store = SqliteDeviceStateStore::new(db.pool().clone());
            serve(config, Arc::new(store)).await
        }
    }
}

async fn serve<S>(config: Config, store: Arc<S>) -> Result<(), Box<dyn std::error::Error>>
where
    S: DeviceStateStore + 'static,
{
    let registry = Registry::new(config.registry.policy, store, config.registry_options());
    let service = Arc::new(DeviceService::new(registry));

    // Console
    let (exit_tx, exit_rx) = oneshot::channel::<()>();
    if config.console.enabled {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let lines = shell::stdin_lines();
            if let Err(err) = shell::run(&service, lines, std::io::stdout()).await {
                tracing::warn!(error = %err, "console output failed");
            }
            let _ = exit_tx.send(());
        });
    } else {
        drop(exit_tx);
    }

    // HTTP
    let app = fluxhub_adapter_http_axum::router::build(AppState::from_arcs(Arc::clone(&service)));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "fluxhubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(exit_rx))
        .await?;

    service.shutdown().await;
    tracing::info!("fluxhubd stopped");
    Ok(())
}

async fn shutdown_signal(console_exit: oneshot::Receiver<()>) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "failed to listen for ctrl-c");
            }
        }
        Ok(()) = console_exit => {}
    }
    tracing::info!("shutdown requested");
}
