// src/ingest/mod.rs
pub mod http;
pub mod providers;
pub mod scheduler;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::config::ProvidersConfig;
use crate::content::Content;
use crate::error::Result;
use crate::ingest::providers::{JsonVideoProvider, XmlArticleProvider};
use crate::ingest::types::{ContentProvider, ProviderInfo};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items fetched from providers.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/decode errors (skipped)."
        );
        describe_histogram!("ingest_fetch_ms", "Provider fetch time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Provider decode time in milliseconds.");
    });
}

/// Owns the registered adapters and fans fetches out across them.
pub struct ProviderManager {
    providers: Vec<Arc<dyn ContentProvider>>,
}

impl ProviderManager {
    pub fn new(providers: Vec<Arc<dyn ContentProvider>>) -> Self {
        Self { providers }
    }

    /// One adapter per known source: JSON videos and XML articles.
    pub fn from_config(cfg: &ProvidersConfig) -> Result<Self> {
        let client = http::build_client()?;
        let timeout = Duration::from_secs(cfg.timeout_secs);
        Ok(Self::new(vec![
            Arc::new(JsonVideoProvider::new(
                cfg.json_url.clone(),
                timeout,
                client.clone(),
            )),
            Arc::new(XmlArticleProvider::new(cfg.xml_url.clone(), timeout, client)),
        ]))
    }

    pub fn providers(&self) -> &[Arc<dyn ContentProvider>] {
        &self.providers
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn ContentProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn describe(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|p| ProviderInfo::of(p.as_ref()))
            .collect()
    }

    /// Fetch from every provider concurrently.
    ///
    /// A failing provider is logged and skipped; the others still contribute.
    /// Items are stamped with the provider name and merged in registration
    /// order, each provider's own order preserved.
    pub async fn fetch_all(&self, cancel: &CancellationToken) -> Vec<Content> {
        ensure_metrics_described();

        let fetches = self.providers.iter().map(|p| async move {
            let t0 = std::time::Instant::now();
            let res = p.fetch_content(cancel).await;
            histogram!("ingest_fetch_ms", "provider" => p.name().to_string())
                .record(t0.elapsed().as_secs_f64() * 1_000.0);
            (p, res)
        });
        let outcomes = futures::future::join_all(fetches).await;

        let mut all = Vec::new();
        for (p, res) in outcomes {
            match res {
                Ok(mut items) => {
                    let name = p.name();
                    for it in items.iter_mut() {
                        it.provider = name.to_string();
                    }
                    tracing::debug!(provider = name, count = items.len(), "provider fetched");
                    counter!("ingest_items_total", "provider" => name.to_string())
                        .increment(items.len() as u64);
                    all.append(&mut items);
                }
                Err(e) => {
                    tracing::warn!(error = %e, provider = p.name(), "provider error");
                    counter!("ingest_provider_errors_total", "provider" => p.name().to_string())
                        .increment(1);
                }
            }
        }
        all
    }
}
