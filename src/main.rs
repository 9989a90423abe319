//! Content search service: binary entrypoint.
//! Loads config, wires the store, providers and search service, starts the
//! background refresh loop and hands the Axum router to Shuttle.

use std::time::Duration;

use content_search::config::ServiceConfig;
use content_search::ingest::scheduler::spawn_refresh_loop;
use content_search::metrics::Metrics;
use content_search::{build_app, telemetry};
use shuttle_axum::ShuttleAxum;
use tokio_util::sync::CancellationToken;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    let cfg = ServiceConfig::load()?;
    telemetry::init_tracing(&cfg.logging);

    let app = build_app(&cfg)?;
    let mut router = app.router;

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    let every = cfg.providers.refresh_interval_secs;
    if every > 0 {
        // Lives as long as the process; the token is never cancelled here.
        spawn_refresh_loop(
            app.service.clone(),
            Duration::from_secs(every),
            CancellationToken::new(),
        );
    } else {
        tracing::info!("periodic refresh disabled");
    }

    Ok(router.into())
}
