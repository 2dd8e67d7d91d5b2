use queuewatch_core::{ClassifierConfig, QueuewatchConfig};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{fmt, EnvFilter};

use queuewatch_server::server;
use queuewatch_server::store::PgSessionStore;
use queuewatch_server::subsystems::intake;
use queuewatch_server::subsystems::mutator::AgentStateMutator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (production uses real env vars)
    dotenvy::dotenv().ok();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match QueuewatchConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration from environment: {}", e);
            std::process::exit(1);
        }
    };

    // The pool connects lazily; an unreachable database only degrades
    // mutations to logged no-ops until it comes back.
    let pool = queuewatch_core::db::create_pool(&config.database);
    let store = PgSessionStore::new(pool, config.service.table.clone());
    match queuewatch_core::db::health_check(store.pool()).await {
        Ok(version) => {
            tracing::info!("Connected to PostgreSQL: {}", version);
            if let Err(e) = store.ensure_schema().await {
                tracing::error!(table = %store.table(), error = %e, "Failed to create agent session table, will retry on first event");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "PostgreSQL unreachable, continuing without a store connection");
        }
    }
    let mutator = AgentStateMutator::new(Arc::new(store.clone()));

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let (event_tx, event_rx) = mpsc::channel(config.service.event_buffer.max(1));

    let intake_handle = tokio::spawn(intake::run_intake(
        config.ami.clone(),
        config.service.clone(),
        event_tx,
        tx.subscribe(),
    ));

    let classifier = ClassifierConfig::from(&config.service);
    server::run_event_loop(event_rx, classifier, mutator, tx.subscribe()).await;

    let _ = tx.send(());
    if let Err(e) = intake_handle.await {
        tracing::error!("AMI intake task failed: {}", e);
    }

    store.close().await;
    tracing::info!("PostgreSQL connection closed");

    Ok(())
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    res = tokio::signal::ctrl_c() => {
                        if let Err(e) = res {
                            tracing::error!("Failed to listen for Ctrl+C: {}", e);
                        }
                    }
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => tracing::warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
