//! In-process store. A single `RwLock` guards the table; `bulk_upsert` works
//! on a staged copy and swaps it in only when the whole batch succeeded.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::{rank_order, ContentStore, SearchQuery, UpsertSummary};
use crate::content::{Content, ContentId, ContentKind, ContentStats, SearchPage};
use crate::error::{ContentError, Result};

#[derive(Debug, Clone, Default)]
struct Table {
    rows: BTreeMap<ContentId, Content>,
    /// Live rows only.
    identity: HashMap<(String, String), ContentId>,
    last_id: ContentId,
}

impl Table {
    fn live(&self) -> impl Iterator<Item = &Content> {
        self.rows.values().filter(|c| !c.is_deleted())
    }

    fn upsert(&mut self, mut item: Content) -> Result<bool> {
        let key = (item.provider.clone(), item.provider_id.clone());
        match self.identity.get(&key).copied() {
            Some(id) => {
                let existing = self
                    .rows
                    .get(&id)
                    .ok_or_else(|| ContentError::Persistence(format!("dangling identity {id}")))?;
                if existing.kind() != item.kind() {
                    return Err(ContentError::Validation(format!(
                        "kind of {}/{} is {}, refusing {}",
                        key.0,
                        key.1,
                        existing.kind(),
                        item.kind()
                    )));
                }
                item.id = Some(id);
                item.created_at = existing.created_at;
                item.deleted_at = None;
                self.rows.insert(id, item);
                Ok(false)
            }
            None => {
                self.last_id += 1;
                let id = self.last_id;
                item.id = Some(id);
                item.deleted_at = None;
                self.rows.insert(id, item);
                self.identity.insert(key, id);
                Ok(true)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table>> {
        self.table
            .read()
            .map_err(|_| ContentError::Persistence("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table>> {
        self.table
            .write()
            .map_err(|_| ContentError::Persistence("store lock poisoned".into()))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find_by_id(&self, id: ContentId) -> Result<Content> {
        self.read()?
            .rows
            .get(&id)
            .filter(|c| !c.is_deleted())
            .cloned()
            .ok_or_else(|| ContentError::NotFound(format!("id {id}")))
    }

    async fn find_by_identity(&self, provider: &str, provider_id: &str) -> Result<Content> {
        let t = self.read()?;
        t.identity
            .get(&(provider.to_string(), provider_id.to_string()))
            .and_then(|id| t.rows.get(id))
            .cloned()
            .ok_or_else(|| ContentError::NotFound(format!("{provider}/{provider_id}")))
    }

    async fn query(&self, q: &SearchQuery) -> Result<SearchPage> {
        let needle = q.needle();
        let mut hits: Vec<Content> = {
            let t = self.read()?;
            t.live()
                .filter(|c| q.kind.matches(c.kind()) && c.matches_text(&needle))
                .cloned()
                .collect()
        };
        hits.sort_by(rank_order);
        let total = hits.len() as u64;
        let page = hits
            .into_iter()
            .skip(q.page.offset())
            .take(q.page.limit as usize)
            .collect();
        Ok(SearchPage::new(page, total, q.page))
    }

    async fn top_by_score(&self, limit: u32) -> Result<Vec<Content>> {
        let mut all: Vec<Content> = self.read()?.live().cloned().collect();
        all.sort_by(rank_order);
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn bulk_upsert(&self, items: Vec<Content>) -> Result<UpsertSummary> {
        if items.is_empty() {
            return Ok(UpsertSummary::default());
        }
        let mut guard = self.write()?;
        let mut staged = guard.clone();
        let mut summary = UpsertSummary::default();
        for item in items {
            if staged.upsert(item)? {
                summary.inserted += 1;
            } else {
                summary.updated += 1;
            }
        }
        *guard = staged;
        Ok(summary)
    }

    async fn soft_delete(&self, id: ContentId) -> Result<()> {
        let mut t = self.write()?;
        let row = t
            .rows
            .get_mut(&id)
            .filter(|c| !c.is_deleted())
            .ok_or_else(|| ContentError::NotFound(format!("id {id}")))?;
        row.deleted_at = Some(Utc::now());
        let key = (row.provider.clone(), row.provider_id.clone());
        t.identity.remove(&key);
        Ok(())
    }

    async fn stats(&self) -> Result<ContentStats> {
        let t = self.read()?;
        let mut stats = ContentStats {
            total_content: 0,
            video_count: 0,
            text_count: 0,
            last_updated: None,
        };
        for c in t.live() {
            stats.total_content += 1;
            match c.kind() {
                ContentKind::Video => stats.video_count += 1,
                ContentKind::Text => stats.text_count += 1,
            }
            stats.last_updated = stats.last_updated.max(Some(c.updated_at));
        }
        Ok(stats)
    }
}
