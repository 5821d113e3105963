//! Lakeside booking bot server.
//!
//! Serves the chat gateway endpoint and the read-only catalog queries, backed
//! by `PostgreSQL`.

use anyhow::Context;
use lakeside_bot::api::{AppState, build_router};
use lakeside_bot::config::Config;
use lakeside_bot::conversation::BookingPolicy;
use lakeside_bot::transport::{HttpRelayTransport, LogTransport};
use lakeside_bot::{BookingBot, ModeratorRoster};
use lakeside_core::ChatTransport;
use lakeside_core::environment::SystemClock;
use lakeside_postgres::{PostgresBookingStore, connect};
use lakeside_runtime::metrics::MetricsServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Lakeside booking bot");
    info!(
        host = %config.server.host,
        port = config.server.port,
        moderators = config.moderators.all().len(),
        relay = config.transport.relay_url.as_deref().unwrap_or("log"),
        "Configuration loaded"
    );

    // Metrics
    let metrics_addr: SocketAddr = format!("{}:{}", config.server.metrics_host, config.server.metrics_port)
        .parse()
        .context("Invalid metrics address")?;
    let mut metrics_server = MetricsServer::new(metrics_addr);
    if let Err(e) = metrics_server.start() {
        warn!(error = %e, "Metrics exporter not started");
    }

    // Storage
    info!("Connecting to database...");
    let pool = connect(&config.database.url, config.database.pool_settings()).await?;
    let store = Arc::new(PostgresBookingStore::new(pool, Arc::new(SystemClock)));
    store.migrate().await?;
    let seeded = store.seed_if_empty().await?;
    info!(seeded, "Database ready");

    // Chat side
    let transport: Arc<dyn ChatTransport> = match &config.transport.relay_url {
        Some(url) => Arc::new(HttpRelayTransport::new(url.clone(), config.transport.timeout())?),
        None => {
            warn!("RELAY_URL not set; outbound messages are only logged");
            Arc::new(LogTransport)
        },
    };
    let roster = Arc::new(ModeratorRoster::from_config(&config.moderators));
    let policy = BookingPolicy::new(config.booking.weekend(), config.booking.offset());

    let bot = BookingBot::new(
        Arc::new(SystemClock),
        store.clone(),
        store.clone(),
        transport,
        roster,
        policy,
    );

    let sweeper = spawn_session_sweeper(
        bot.clone(),
        config.sessions.sweep_interval(),
        config.sessions.max_idle(),
    );

    let state = AppState::new(bot.clone(), store.clone(), store.clone(), store);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    bot.shutdown();
    sweeper.abort();
    let _ = stop_tx.send(());

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(Ok(Ok(()))) => info!("Server stopped"),
        Ok(Ok(Err(e))) => warn!(error = %e, "Server error during shutdown"),
        Ok(Err(e)) => warn!(error = %e, "Server task failed"),
        Err(_) => warn!(timeout_secs = config.server.shutdown_timeout, "Graceful shutdown timed out"),
    }
    Ok(())
}

/// Periodically drop idle conversation sessions
fn spawn_session_sweeper(
    bot: BookingBot,
    interval: Duration,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = bot.sweep_sessions(max_idle).await;
            tracing::debug!(removed, "Session sweep finished");
        }
    })
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
