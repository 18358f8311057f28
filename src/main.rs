use garage_assistant::api::{create_router, AppState};
use garage_assistant::bootstrap::bootstrap;
use garage_assistant::infrastructure::{AppConfig, DefaultBackends};
use garage_assistant::telemetry;
use std::net::SocketAddr;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init("api=debug,garage_assistant=debug,tower_http=debug");

    let config = AppConfig::load()?;
    // rig's Ollama client reads its endpoint from the environment.
    if std::env::var_os("OLLAMA_API_BASE_URL").is_none() {
        std::env::set_var("OLLAMA_API_BASE_URL", &config.config.llm.base_url);
    }

    let engine = bootstrap(&config, |key| std::env::var(key).ok(), &DefaultBackends).await?;

    let addr = SocketAddr::new(
        config.config.server.host.parse()?,
        config.config.server.port,
    );
    let app = create_router(AppState::new(engine, config));

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
