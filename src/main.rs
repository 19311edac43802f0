use axum::extract::DefaultBodyLimit;
use fauna_gateway::api::routes::create_router;
use fauna_gateway::config::AppConfig;
use fauna_gateway::engine::RemoteEngine;
use fauna_gateway::gateway::Gateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with explicit filter to suppress hyper debug logs
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter_module("hyper", LevelFilter::Warn)
        .init();

    let config = AppConfig::load()?;
    log::info!(
        "configuration loaded: server={}:{}, workers={}",
        config.server.host,
        config.server.port,
        config.server.workers
    );

    // Size the runtime from configuration instead of the #[tokio::main]
    // default.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let engine = RemoteEngine::new(&config.engine)?;
    let gateway = Gateway::new(
        engine,
        config.engine.extra_fields.clone(),
        config.scratch_dir(),
    )?;
    log::info!(
        "gateway ready: model={}, geofence={}, engine={}",
        config.engine.model,
        config.engine.geofence,
        config.engine.endpoint
    );

    let app = create_router().with_state(Arc::new(gateway)).layer(
        ServiceBuilder::new()
            // Raise axum's default extractor limit and bound the raw body to
            // the same configured size.
            .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
            .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
            // Innermost so its inner service is the route itself, whose body
            // type satisfies the `Default` bound `TimeoutLayer` requires.
            .layer(TimeoutLayer::new(Duration::from_secs(config.server.timeout_secs))),
    );

    let listener = bind(&config)?;
    log::info!("gateway listening on http://{}", listener.local_addr()?);

    // Graceful shutdown keeps in-flight requests running to their cleanup
    // step instead of dropping them mid-pipeline.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn bind(config: &AppConfig) -> anyhow::Result<TcpListener> {
    let addr: std::net::SocketAddr = config.server_address().parse()?;
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    Ok(socket.listen(config.server.backlog)?)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for shutdown signal: {}", err);
    }
}
