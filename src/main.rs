//! klash-sync binary entrypoint wiring the replica, its storage slot, the bus and the HTTP layer.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use klash_sync::{
    config::AppConfig,
    dao::{catalog::load_catalog, snapshot_store::FileSnapshotStore},
    routes,
    services::{intake, relay, storage_watcher},
    state::{Bus, Replica, Role, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let catalog = match load_catalog(&config.catalog_path).await {
        Ok(rounds) => {
            info!(count = rounds.len(), "round catalog ready");
            rounds
        }
        Err(err) => {
            warn!(error = %err, "failed to load round catalog; starting empty");
            Vec::new()
        }
    };

    let store = FileSnapshotStore::new(&config.storage_dir, &config.session_key);
    info!(path = %store.path().display(), "using snapshot slot");

    let mut builder = Replica::builder(config.role)
        .with_initial_state(config.initial_state())
        .with_store(Arc::new(store))
        .with_catalog(catalog)
        .with_storage_timeout(config.storage_timeout);
    if config.broadcast {
        let bus = Bus::new(config.bus_capacity);
        start_relay(&config, bus.clone()).await;
        builder = builder.with_bus(bus);
    } else {
        info!("broadcast disabled; replicating through storage polling only");
    }
    let replica = builder.build();
    info!(origin = %replica.origin(), role = ?replica.role(), "replica started");

    // subscribe to the bus before reading storage so nothing falls between the two
    intake::spawn_bus_intake(replica.clone());
    replica.hydrate().await;
    storage_watcher::spawn(replica.clone(), config.poll_interval);

    // Build the HTTP router once the replica is ready.
    let app = build_router(replica.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    replica.flush().await;
    info!("final snapshot written; bye");
    Ok(())
}

/// Join this process's bus to the others on the device.
///
/// The host listens on the relay address; displays dial it and keep retrying.
async fn start_relay(config: &AppConfig, bus: Bus) {
    match config.role {
        Role::Host => match TcpListener::bind(config.relay_addr).await {
            Ok(listener) => {
                info!(addr = %config.relay_addr, "bus relay listening");
                relay::spawn_server(bus, listener);
            }
            Err(err) => {
                warn!(addr = %config.relay_addr, error = %err, "bus relay unavailable; displays fall back to storage polling");
            }
        },
        Role::Display => {
            info!(addr = %config.relay_addr, "bus relay dialing host");
            relay::spawn_client(bus, config.relay_addr);
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
