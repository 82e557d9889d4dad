use anyhow::{Context, Result};
use clinic_ledger::api::{self, AppState};
use clinic_ledger::config::Settings;
use clinic_ledger::{Clinic, Clock, Database, SystemClock};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load().context("Failed to load configuration")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let db = Database::open(&settings.database.path)?;
    tracing::info!(path = %db.path().display(), "database ready");
    if settings.database.seed_demo_data {
        db.seed_demo_data(clock.now())?;
    }

    let clinic = Clinic::new(db, clock);
    let app = api::router(AppState::new(clinic, settings.public_base_url.as_str()));

    let addr = settings
        .bind_address()
        .context("Invalid server host or port")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(%addr, "clinic ledger listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
