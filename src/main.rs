use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use marketflow::adapters::postgres::PostgresRepository;
use marketflow::adapters::web::{AppState, build_router};
use marketflow::adapters::RedisCache;
use marketflow::app::{ExchangeEndpoint, Mode, PriceService};
use marketflow::config::AppConfig;
use marketflow::domain::ports::{Cache, PriceRepository};
use marketflow::logging;

const SHUTDOWN_DEADLINE: std::time::Duration = std::time::Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let _guard = logging::init_logging(&config);

    info!(app_env = %config.app_env, "starting marketflow");

    let postgres = PostgresRepository::connect(&config.postgres.connection_string()).await?;
    postgres.ensure_schema().await?;
    let repository: Arc<dyn PriceRepository> = Arc::new(postgres);

    let cache: Arc<dyn Cache> = Arc::new(RedisCache::connect(&config.redis.connection_url(), config.redis.ttl).await?);

    let root_cancel = CancellationToken::new();

    let live_endpoints = config
        .exchanges
        .iter()
        .map(|e| ExchangeEndpoint { name: e.name.clone(), addr: e.address.clone() })
        .collect();

    let service = PriceService::start(
        live_endpoints,
        Mode::Test,
        5,
        config.aggregator_window,
        cache.clone(),
        repository.clone(),
        root_cancel.clone(),
    )
    .await;

    let state = Arc::new(AppState::new(
        service.mode_manager.clone(),
        service.sink.clone(),
        cache.clone(),
        repository.clone(),
    ));

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.api_addr).await?;
    info!(addr = %config.api_addr, "listening");

    let server_cancel = root_cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                server_cancel.cancelled().await;
            })
            .await
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    root_cancel.cancel();

    if let Ok(Err(e)) = server.await {
        error!(error = %e, "http server exited with error");
    }

    match tokio::time::timeout(SHUTDOWN_DEADLINE, service.shutdown()).await {
        Ok(()) => info!("shutdown complete"),
        Err(_) => warn!("shutdown exceeded 5s deadline, exiting anyway"),
    }

    Ok(())
}
