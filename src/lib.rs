pub mod api; // HTTP surface
pub mod cache;
pub mod clients; // RxNorm, OpenFDA, DailyMed
pub mod clinical;
pub mod config;
pub mod interactions;
pub mod models;
pub mod report;
pub mod safety;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::clients::{DailyMedClient, OpenFdaClient, RxNormClient, UpstreamError};
use crate::clinical::ClinicalApiService;
use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] UpstreamError),
    #[error("{0}")]
    Server(String),
}

/// Wire the real upstream clients into a clinical service.
pub fn build_context(config: &AppConfig) -> Result<ApiContext, StartupError> {
    let clinical = ClinicalApiService::new(
        Arc::new(RxNormClient::from_config(config)?),
        Arc::new(OpenFdaClient::from_config(config)?),
        Arc::new(DailyMedClient::from_config(config)?),
        config.cache_ttl(),
        config.cache_max_entries,
    );
    Ok(ApiContext::new(Arc::new(clinical)))
}

/// Run the service until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = AppConfig::from_env();
    if let Ok(json) = serde_json::to_string(&config) {
        tracing::debug!(config = %json, "Loaded configuration");
    }

    let ctx = build_context(&config)?;
    let sweeper = cache::spawn_sweeper(ctx.clinical.caches(), config.cache_sweep_interval());

    let mut server = api::start_api_server(ctx, config.bind_addr)
        .await
        .map_err(StartupError::Server)?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }

    server.shutdown();
    server.stopped().await;
    sweeper.shutdown().await;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
