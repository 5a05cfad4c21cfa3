use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seat_reservation::{
    cache::{CacheService, NoopCache, SeatCache},
    config::Config,
    controllers,
    database::Database,
    redis_client::RedisClient,
    services::{ExpirySweeper, SweeperSettings},
    AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    let json_logs = config.app.log_json;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    info!(environment = %config.app.environment, "Starting Seat Reservation API");

    // Connect to the database
    let db = Database::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Database connected");

    db.run_migrations()
        .await
        .context("failed to run migrations")?;

    // Redis опционален: без него кеш мест просто не используется
    let cache: Arc<dyn SeatCache> = match &config.redis {
        Some(redis_config) => {
            let redis = RedisClient::new(&redis_config.url)
                .await
                .context("failed to connect to Redis")?;
            redis.ping().await.context("Redis did not answer PING")?;
            info!("Redis connected");
            Arc::new(CacheService::new(redis))
        }
        None => {
            warn!("REDIS_URL is not set, seats cache disabled");
            Arc::new(NoopCache)
        }
    };

    let (seats, bookings) = db.stores();
    let app_state = AppState::new(seats, bookings.clone(), cache.clone(), config.clone());

    // --- Start background tasks ---

    let (sweeper, sweeper_shutdown) = ExpirySweeper::new(
        bookings,
        cache,
        SweeperSettings::from(&config.reservation),
    );
    let sweeper_handle = tokio::spawn(sweeper.run());

    // --- Start the web server ---

    let app = controllers::app(app_state);

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .context("invalid HOST/PORT")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutting down...");
    sweeper_shutdown.send(true).ok();
    if let Err(e) = sweeper_handle.await {
        warn!(error = %e, "sweeper task ended abnormally");
    }

    info!("Server exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
