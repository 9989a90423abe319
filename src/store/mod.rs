//! Persistence contract for `Content` rows plus the merge policy.
//!
//! Identity is `(provider, provider_id)`. `bulk_upsert` inserts unknown
//! identities under a fresh surrogate id and overwrites known ones in place,
//! keeping their id and `created_at`. A batch is applied entirely or not at
//! all. Soft-deleted rows are invisible to reads and to identity resolution.

pub mod memory;
pub mod schema;
pub mod sqlite;

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::{StorageBackend, StorageConfig};
use crate::content::{Content, ContentId, ContentStats, KindFilter, PageRequest, SearchPage};
use crate::error::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Filter + page for `ContentStore::query`. The page is already clamped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub text: String,
    pub kind: KindFilter,
    pub page: PageRequest,
}

impl SearchQuery {
    /// Lowercased needle used for case-insensitive substring matching.
    /// Whitespace is significant; only an empty text matches everything.
    pub fn needle(&self) -> String {
        self.text.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_by_id(&self, id: ContentId) -> Result<Content>;
    async fn find_by_identity(&self, provider: &str, provider_id: &str) -> Result<Content>;
    /// Filtered page ordered by `final_score` descending.
    async fn query(&self, q: &SearchQuery) -> Result<SearchPage>;
    async fn top_by_score(&self, limit: u32) -> Result<Vec<Content>>;
    async fn bulk_upsert(&self, items: Vec<Content>) -> Result<UpsertSummary>;
    async fn soft_delete(&self, id: ContentId) -> Result<()>;
    async fn stats(&self) -> Result<ContentStats>;
}

/// Ranking order: higher `final_score` first, then lower id for stable pages.
pub fn rank_order(a: &Content, b: &Content) -> Ordering {
    b.scores
        .final_score
        .total_cmp(&a.scores.final_score)
        .then_with(|| a.id.cmp(&b.id))
}

/// Open the backend selected in config.
pub fn open(cfg: &StorageConfig) -> anyhow::Result<Arc<dyn ContentStore>> {
    let store: Arc<dyn ContentStore> = match cfg.backend {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::Sqlite => Arc::new(
            SqliteStore::open(&cfg.path)
                .with_context(|| format!("opening sqlite store at {}", cfg.path.display()))?,
        ),
    };
    Ok(store)
}
