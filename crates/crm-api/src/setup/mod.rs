//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use crm_core::Config;
use crm_db::{DealRepository, DealStore};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;

    crate::telemetry::init_telemetry()?;
    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let store: Arc<dyn DealStore> = Arc::new(DealRepository::new(pool));

    let state = services::initialize_services(&config, store).await?;
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
