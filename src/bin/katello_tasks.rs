//! # Katello Task Server
//!
//! Serves the sync-completion callback and task listing, and sweeps in-flight
//! tasks in the background.
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: in-memory store, config/katello.toml when present
//! cargo run --bin katello-tasks
//!
//! # Explicit file, overrides from the environment
//! KATELLO_CONFIG=/etc/katello/tasks.toml KATELLO_DATABASE__URL=postgres://... cargo run --bin katello-tasks
//! ```

use anyhow::Context;
use katello_tasks::client::RemoteClients;
use katello_tasks::config::{ConfigManager, KatelloConfig};
use katello_tasks::database::InMemoryTaskStore;
use katello_tasks::logging;
use katello_tasks::orchestration::{
    register_builtin_hooks, OrchestratorSettings, OwnerActions, PollSweeper, TaskOrchestrator,
};
use katello_tasks::registry::{HookRegistry, OwnerRegistry};
use katello_tasks::state_machine::TaskRecordStore;
use katello_tasks::web::{create_router, AppState, CallbackIngestor, SyncToken};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let manager = ConfigManager::load().context("failed to load configuration")?;
    let config = manager.config();

    // Initialize logging first
    logging::init_structured_logging(&config.logging);
    manager.report();

    info!("🚀 Starting Katello task server...");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));
    info!("   Environment: {}", manager.environment());

    let store = open_store(config).await?;
    let clients = RemoteClients::from_config(&config.remote, &config.integrations)
        .context("failed to configure remote clients")?;
    let owners = Arc::new(OwnerRegistry::new(config.integrations));
    let hooks = Arc::new(HookRegistry::new());
    register_builtin_hooks(&hooks, &owners, &clients);

    let orchestrator = Arc::new(TaskOrchestrator::new(
        store,
        clients,
        owners,
        hooks,
        OrchestratorSettings::from_config(config),
    ));

    let token = SyncToken::new(
        config
            .callback
            .resolved_token()
            .context("invalid callback configuration")?,
    );
    let callbacks = Arc::new(CallbackIngestor::new(token, Arc::clone(&orchestrator)));
    let state = AppState::new(OwnerActions::new(Arc::clone(&orchestrator)), callbacks);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = PollSweeper::from_config(Arc::clone(&orchestrator), &config.refresh).spawn(shutdown_rx);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    info!(address = %config.server.bind_address, "🌐 Web API listening");
    info!("   Press Ctrl+C to shutdown gracefully");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("web server failed")?;

    info!("🛑 Shutdown signal received, stopping poll sweeper...");
    if shutdown_tx.send(true).is_err() {
        warn!("Poll sweeper already stopped");
    }
    if let Err(e) = sweeper.await {
        error!("Poll sweeper ended abnormally: {}", e);
    }

    info!("👋 Katello task server shutdown complete");
    Ok(())
}

#[cfg(feature = "postgres")]
async fn open_store(config: &KatelloConfig) -> anyhow::Result<Arc<dyn TaskRecordStore>> {
    use katello_tasks::database::{connect, run_migrations, PgTaskStore};

    if config.database.url.is_none() {
        return Ok(in_memory_store());
    }
    let pool = connect(&config.database).await.context("failed to connect to database")?;
    run_migrations(&pool).await.context("failed to run migrations")?;
    Ok(Arc::new(PgTaskStore::new(pool)))
}

#[cfg(not(feature = "postgres"))]
async fn open_store(config: &KatelloConfig) -> anyhow::Result<Arc<dyn TaskRecordStore>> {
    if config.database.url.is_some() {
        warn!("database.url is set but PostgreSQL support is not compiled in");
    }
    Ok(in_memory_store())
}

fn in_memory_store() -> Arc<dyn TaskRecordStore> {
    warn!("No database configured, task records are kept in memory only");
    Arc::new(InMemoryTaskStore::new())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
