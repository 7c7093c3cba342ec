//! Stagepass cloud service
//!
//! Event ticketing checkout and payment reconciliation. Routes charges to
//! Paystack or Stripe, verifies provider webhooks, and materializes orders
//! exactly once per provider reference.

mod api;
mod config;
mod db;
mod email;
mod error;
mod payments;
mod reconcile;
mod state;

use config::Config;
use state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), error::BoxError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stagepass_cloud=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(environment = %config.environment, "starting stagepass-cloud");

    let state = AppState::new(&config).await?;
    let app = api::create_router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "http server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
