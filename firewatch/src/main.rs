use axum::{routing::get, Router};
use firewatch::alerts::AlertDispatcher;
use firewatch::config::{Config, StoreKind};
use firewatch::db::{make_pool, PgStore};
use firewatch::memory::MemoryStore;
use firewatch::push::ExpoPushSender;
use firewatch::store::TelemetryStore;
use firewatch::subscriptions::SubscriptionTable;
use firewatch::{create_router, metrics, retention, AppState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Firewatch");
    info!("HTTP server: {}", config.http_addr);
    info!("Push endpoint: {}", config.push_endpoint);
    info!("Exclude sender from alerts: {}", config.alert_policy.exclude_sender);

    // Initialize metrics
    metrics::init_metrics();

    let store: Arc<dyn TelemetryStore> = match &config.store {
        StoreKind::Postgres { database_url } => {
            info!("Database: {}", database_url.split('@').last().unwrap_or("***"));
            match make_pool(database_url, config.db_max_connections).await {
                Ok(pool) => Arc::new(PgStore::new(pool)),
                Err(e) => {
                    error!("Failed to connect to database: {}", e);
                    std::process::exit(1);
                }
            }
        }
        StoreKind::Memory => {
            warn!("Using in-memory store; readings are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let push = ExpoPushSender::new(config.push_endpoint.clone(), config.push_access_token.clone())?;
    let dispatcher = AlertDispatcher::new(Arc::new(push), config.alert_policy);
    let state = AppState::new(
        store.clone(),
        Arc::new(SubscriptionTable::new()),
        Arc::new(dispatcher),
    );

    let cancel = CancellationToken::new();

    // Spawn retention sweep
    let retention_handle = tokio::spawn(retention::run(store, cancel.clone()));

    // Build HTTP app with REST API, viewer socket and metrics endpoint
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(create_router(state));

    let listener = tokio::net::TcpListener::bind(&config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    let shutdown = cancel.clone();
    let mut server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap_or_else(|e| {
                error!("HTTP server error: {}", e);
            });
    });

    let server_finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            false
        }
        _ = &mut server_handle => {
            error!("HTTP server terminated");
            true
        }
    };

    cancel.cancel();
    if !server_finished {
        if let Err(e) = server_handle.await {
            error!("HTTP server task failed: {}", e);
        }
    }
    if let Err(e) = retention_handle.await {
        error!("Retention task failed: {}", e);
    }

    info!("Shutting down");
    Ok(())
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
