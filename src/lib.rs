//! Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod scoring;
pub mod search;
pub mod store;
pub mod telemetry;

use std::sync::Arc;

use anyhow::Context;
use axum::Router;

pub use crate::api::create_router;
pub use crate::config::ServiceConfig;
pub use crate::error::{ContentError, Result};
pub use crate::search::SearchService;

/// Wired service plus its HTTP router.
pub struct App {
    pub service: Arc<SearchService>,
    pub router: Router,
}

/// Open the configured store, register providers and build the router.
/// Does not install tracing or metrics and does not start the refresh loop.
pub fn build_app(cfg: &ServiceConfig) -> anyhow::Result<App> {
    let store = store::open(&cfg.storage)?;
    let manager = ingest::ProviderManager::from_config(&cfg.providers)
        .context("building provider manager")?;
    let service = Arc::new(SearchService::new(store, Arc::new(manager)));
    let router = create_router(api::AppState {
        service: service.clone(),
    });
    tracing::info!(
        backend = ?cfg.storage.backend,
        providers = service.get_providers().len(),
        "app built"
    );
    Ok(App { service, router })
}
