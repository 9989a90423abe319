//! Search service: composes the provider manager, the scoring functions and
//! the content store into the operations the HTTP layer needs.
//!
//! Scores stored next to a row are a cache. Every read path recomputes them
//! against the current clock before handing content out.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::content::{
    clamp_limit, Content, ContentId, ContentStats, KindFilter, PageRequest, SearchPage,
};
use crate::error::{ContentError, Result};
use crate::ingest::types::ProviderInfo;
use crate::ingest::ProviderManager;
use crate::scoring;
use crate::store::{rank_order, ContentStore, SearchQuery};

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("refresh_runs_total", "Completed content refreshes.");
        describe_counter!(
            "refresh_failures_total",
            "Refreshes that failed or were cancelled."
        );
        describe_gauge!(
            "refresh_last_run_ts",
            "Unix timestamp of the last successful refresh."
        );
    });
}

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RefreshReport {
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
}

/// A single item plus its labeled score components.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentDetail {
    pub content: Content,
    pub score_breakdown: BTreeMap<&'static str, f64>,
}

pub struct SearchService {
    store: Arc<dyn ContentStore>,
    manager: Arc<ProviderManager>,
    refresh_lock: Mutex<()>,
}

impl SearchService {
    pub fn new(store: Arc<dyn ContentStore>, manager: Arc<ProviderManager>) -> Self {
        Self {
            store,
            manager,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Ranked, paginated search. Invalid `page`/`limit` values are clamped.
    pub async fn search(
        &self,
        query: &str,
        kind: KindFilter,
        page: i64,
        limit: i64,
    ) -> Result<SearchPage> {
        let q = SearchQuery {
            text: query.to_string(),
            kind,
            page: PageRequest::clamped(page, limit),
        };
        let mut result = self.store.query(&q).await?;
        rescore(&mut result.contents);
        tracing::debug!(
            query = %q.text,
            kind = ?q.kind,
            page = q.page.page,
            total = result.total,
            "search"
        );
        Ok(result)
    }

    /// Like `search`, with the kind taken from `filters["type"]`.
    /// A non-string `type` is treated as absent; other keys are ignored.
    pub async fn search_with_filters(
        &self,
        query: &str,
        filters: &HashMap<String, serde_json::Value>,
        page: i64,
        limit: i64,
    ) -> Result<SearchPage> {
        let kind = match filters.get("type") {
            Some(serde_json::Value::String(s)) => s.parse()?,
            _ => KindFilter::All,
        };
        self.search(query, kind, page, limit).await
    }

    pub async fn get_content_by_id(&self, id: ContentId) -> Result<Content> {
        let mut content = self.store.find_by_id(id).await?;
        scoring::calculate_score(&mut content, Utc::now());
        Ok(content)
    }

    pub async fn get_content_detail(&self, id: ContentId) -> Result<ContentDetail> {
        let mut content = self.store.find_by_id(id).await?;
        let score_breakdown = scoring::score_breakdown(&mut content, Utc::now());
        Ok(ContentDetail {
            content,
            score_breakdown,
        })
    }

    /// Top items by score. `limit` follows the same clamping as `search`.
    pub async fn get_popular_content(&self, limit: i64) -> Result<Vec<Content>> {
        let mut items = self.store.top_by_score(clamp_limit(limit)).await?;
        rescore(&mut items);
        Ok(items)
    }

    /// Fetch from every provider, score the batch and merge it into the store.
    ///
    /// Provider failures are absorbed by the manager. A store failure aborts the
    /// batch. If `cancel` fires before the write phase nothing is written.
    /// Concurrent refreshes queue on an internal lock.
    pub async fn refresh_content(&self, cancel: &CancellationToken) -> Result<RefreshReport> {
        ensure_metrics_described();
        let _guard = self.refresh_lock.lock().await;

        tracing::info!(providers = self.manager.providers().len(), "refresh started");
        let mut items = self.manager.fetch_all(cancel).await;
        if cancel.is_cancelled() {
            counter!("refresh_failures_total").increment(1);
            tracing::warn!(fetched = items.len(), "refresh cancelled before write");
            return Err(ContentError::Cancelled);
        }

        let now = Utc::now();
        for it in items.iter_mut() {
            it.updated_at = now;
        }
        scoring::calculate_scores(&mut items, now);

        let fetched = items.len();
        let summary = match self.store.bulk_upsert(items).await {
            Ok(s) => s,
            Err(e) => {
                counter!("refresh_failures_total").increment(1);
                tracing::error!(error = %e, fetched, "refresh write failed");
                return Err(e);
            }
        };

        counter!("refresh_runs_total").increment(1);
        gauge!("refresh_last_run_ts").set(now.timestamp() as f64);
        tracing::info!(
            fetched,
            inserted = summary.inserted,
            updated = summary.updated,
            "refresh finished"
        );
        Ok(RefreshReport {
            fetched,
            inserted: summary.inserted,
            updated: summary.updated,
        })
    }

    pub fn get_providers(&self) -> Vec<ProviderInfo> {
        self.manager.describe()
    }

    pub async fn get_content_stats(&self) -> Result<ContentStats> {
        self.store.stats().await
    }
}

/// Recompute scores against `now` and restore ranking order within the slice.
fn rescore(items: &mut [Content]) {
    scoring::calculate_scores(items, Utc::now());
    items.sort_by(rank_order);
}
