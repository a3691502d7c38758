//! weathergate HTTP server.
//!
//! Wires the Redis store, OpenWeather client, fixed-window limiter and weather cache into
//! the axum router and serves it until Ctrl-C.

mod config;

use anyhow::Context;
use config::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};
use weathergate::prelude::*;
use weathergate::OpenWeatherProvider;
use weathergate_redis::RedisStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before the subscriber, so RUST_LOG may come from the file.
    let env_file = config::load_env_file(config::ENV_FILE);

    let filter = EnvFilter::builder().with_default_directive(Level::INFO.into()).from_env_lossy();
    fmt().with_env_filter(filter).with_target(true).init();

    match env_file.context("loading .env")? {
        true => info!(path = config::ENV_FILE, "loaded environment file"),
        false => tracing::debug!(path = config::ENV_FILE, "no environment file"),
    }

    let config = ServerConfig::from_env().context("loading configuration")?;
    info!(?config, "weathergate starting");

    let store = Arc::new(RedisStore::open(&config.redis_url).context("parsing REDIS_URL")?);
    match store.ping().await {
        Ok(()) => info!(url = %config.redis_url, "connected to redis"),
        Err(e) => warn!(
            url = %config.redis_url,
            error = %e,
            "redis unreachable at startup, serving without it"
        ),
    }

    let provider = OpenWeatherProvider::with_base_url(
        config.openweather_url.clone(),
        config.api_key.clone(),
        config.provider_timeout,
    )
    .context("building OpenWeather client")?;

    let limiter = FixedWindow::new(store.clone())
        .with_store_timeout(config.store_timeout)
        .with_sink(LogSink);
    let cache = WeatherCache::new(store.clone(), Arc::new(provider))
        .with_store_timeout(config.store_timeout)
        .with_provider_timeout(config.provider_timeout)
        .with_sink(LogSink);

    let state = AppState::new(Arc::new(limiter), Arc::new(cache), store)
        .with_store_timeout(config.store_timeout);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("weathergate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
