//! ScanGuard server entry point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scanguard_server::{config::Config, create_router, middleware::auth, pipeline::SimulatedRoutine, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scanguard_server=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.json_logs() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("ScanGuard server starting ({})...", config.environment);
    tracing::info!(
        "Client polling: every {}ms, up to {} attempts",
        config.poll_interval_ms,
        config.poll_max_attempts
    );

    if !config.is_production() {
        let dev_user = uuid::Uuid::new_v4();
        let token = auth::issue_token(&config.jwt_secret, dev_user, "analyst", chrono::Duration::hours(24))
            .map_err(|e| anyhow::anyhow!("{:?}", e))?;
        tracing::info!("Development token for user {}: {}", dev_user, token);
    }

    let routine = Arc::new(SimulatedRoutine::new(config.routine_step_delay()));
    let state = AppState::new(config.clone(), routine);
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
