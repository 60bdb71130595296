//! Commonroom - community center website

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commonroom::{api, app, config::Config, db};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "commonroom=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Commonroom v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::var("COMMONROOM_CONFIG").unwrap_or_else(|_| "config.yml".to_string());
    let config = Config::load_with_env(Path::new(&config_path))?;
    tracing::info!(path = %config_path, "Configuration loaded");

    let pool = db::create_pool(&config.database).await?;
    let pending = db::migrations::pending_count(&pool).await?;
    if pending > 0 {
        tracing::info!(pending, "Applying database migrations");
    }
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    let state = app::build_state(&config, pool.clone())?;
    if state.email_service.is_log_only() {
        tracing::info!("SMTP host not configured; emails will only be logged");
    }
    app::spawn_background_tasks(&state);

    let router = api::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
