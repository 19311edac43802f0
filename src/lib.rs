pub mod api;
pub mod config;
pub mod engine;
pub mod gateway;
pub mod model;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export gateway types
pub use gateway::{Gateway, GatewayError, ScratchSpace};

// Export all model types
pub use model::*;

// Export engine types
pub use engine::{PredictionEngine, RemoteEngine};

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with INFO level only (suppress DEBUG logs)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    // Load configuration
    let config = crate::config::AppConfig::load()?;

    // Wire the gateway to the upstream prediction engine
    let remote_engine = crate::engine::RemoteEngine::new(&config.engine)?;
    let gateway = crate::gateway::Gateway::new(
        remote_engine,
        config.engine.extra_fields.clone(),
        config.scratch_dir(),
    )?;

    // Create router with state
    let app = crate::api::routes::create_router().with_state(Arc::new(gateway));

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}
