//! SQLite-backed content store.
//!
//! One `contents` table keyed by surrogate id with a partial unique index on
//! `(provider, provider_id)` over live rows. The connection sits behind a
//! `Mutex`; every call runs on the blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::schema::apply_schema;
use super::{ContentStore, SearchQuery, UpsertSummary};
use crate::content::{Content, ContentId, ContentStats, KindFilter, Metrics, Scores, SearchPage};
use crate::error::{ContentError, Result};

const COLUMNS: &str = "id, provider, provider_id, kind, title, description, url, tags, language, \
     views, likes, duration, reading_time, reactions, \
     base_score, type_multiplier, freshness_score, engagement_score, final_score, \
     published_at, created_at, updated_at, deleted_at";

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| ContentError::Persistence(format!("creating {}: {e}", dir.display())))?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| ContentError::Persistence(format!("store task failed: {e}")))?
    }
}

/// `ulower(text)`: Unicode lowercase. The built-in `LOWER` only folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "ulower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let s: Option<String> = ctx.get(0)?;
            Ok(s.map(|s| s.to_lowercase()))
        },
    )?;
    Ok(())
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| ContentError::Persistence(format!("lock poisoned: {e}")))
}

#[async_trait]
impl ContentStore for SqliteStore {
    async fn find_by_id(&self, id: ContentId) -> Result<Content> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM contents WHERE id = ?1 AND deleted_at IS NULL"),
                params![to_sql_int(id)],
                row_to_content,
            )
            .optional()?
            .ok_or_else(|| ContentError::NotFound(format!("id {id}")))
        })
        .await
    }

    async fn find_by_identity(&self, provider: &str, provider_id: &str) -> Result<Content> {
        let (provider, provider_id) = (provider.to_string(), provider_id.to_string());
        self.with_conn(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM contents \
                     WHERE provider = ?1 AND provider_id = ?2 AND deleted_at IS NULL"
                ),
                params![provider, provider_id],
                row_to_content,
            )
            .optional()?
            .ok_or_else(|| ContentError::NotFound(format!("{provider}/{provider_id}")))
        })
        .await
    }

    async fn query(&self, q: &SearchQuery) -> Result<SearchPage> {
        let pattern = like_pattern(&q.needle());
        let kind = match q.kind {
            KindFilter::All => None,
            KindFilter::Only(k) => Some(k.as_str()),
        };
        let page = q.page;
        self.with_conn(move |conn| {
            let filter = "deleted_at IS NULL \
                 AND (?1 IS NULL OR kind = ?1) \
                 AND (?2 = '%%' \
                      OR ulower(title) LIKE ?2 ESCAPE '\\' \
                      OR ulower(description) LIKE ?2 ESCAPE '\\' \
                      OR ulower(tags) LIKE ?2 ESCAPE '\\')";

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM contents WHERE {filter}"),
                params![kind, pattern],
                |r| r.get(0),
            )?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM contents WHERE {filter} \
                 ORDER BY final_score DESC, id ASC LIMIT ?3 OFFSET ?4"
            ))?;
            let rows = stmt
                .query_map(
                    params![
                        kind,
                        pattern,
                        i64::from(page.limit),
                        to_sql_int(page.offset() as u64)
                    ],
                    row_to_content,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(SearchPage::new(rows, from_sql_int(total), page))
        })
        .await
    }

    async fn top_by_score(&self, limit: u32) -> Result<Vec<Content>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM contents WHERE deleted_at IS NULL \
                 ORDER BY final_score DESC, id ASC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![i64::from(limit)], row_to_content)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn bulk_upsert(&self, items: Vec<Content>) -> Result<UpsertSummary> {
        if items.is_empty() {
            return Ok(UpsertSummary::default());
        }
        self.with_conn(move |conn| {
            // Dropping `tx` on an early return rolls the whole batch back.
            let tx = conn.transaction()?;
            let mut summary = UpsertSummary::default();
            for item in &items {
                let existing: Option<(i64, String)> = tx
                    .query_row(
                        "SELECT id, kind FROM contents \
                         WHERE provider = ?1 AND provider_id = ?2 AND deleted_at IS NULL",
                        params![item.provider, item.provider_id],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )
                    .optional()?;

                match existing {
                    None => {
                        insert_row(&tx, item)?;
                        summary.inserted += 1;
                    }
                    Some((id, kind)) => {
                        if kind != item.kind().as_str() {
                            return Err(ContentError::Validation(format!(
                                "kind of {}/{} is {kind}, refusing {}",
                                item.provider,
                                item.provider_id,
                                item.kind()
                            )));
                        }
                        update_row(&tx, id, item)?;
                        summary.updated += 1;
                    }
                }
            }
            tx.commit()?;
            Ok(summary)
        })
        .await
    }

    async fn soft_delete(&self, id: ContentId) -> Result<()> {
        self.with_conn(move |conn| {
            let n = conn.execute(
                "UPDATE contents SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                params![Utc::now(), to_sql_int(id)],
            )?;
            if n == 0 {
                return Err(ContentError::NotFound(format!("id {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn stats(&self) -> Result<ContentStats> {
        self.with_conn(|conn| {
            let (total, videos, texts, last): (i64, Option<i64>, Option<i64>, Option<DateTime<Utc>>) =
                conn.query_row(
                    "SELECT COUNT(*), \
                            SUM(kind = 'video'), \
                            SUM(kind = 'text'), \
                            MAX(updated_at) \
                     FROM contents WHERE deleted_at IS NULL",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
                )?;
            Ok(ContentStats {
                total_content: from_sql_int(total),
                video_count: from_sql_int(videos.unwrap_or(0)),
                text_count: from_sql_int(texts.unwrap_or(0)),
                last_updated: last,
            })
        })
        .await
    }
}

fn insert_row(tx: &rusqlite::Transaction<'_>, c: &Content) -> rusqlite::Result<()> {
    let (views, likes, duration, reading_time, reactions) = metric_columns(&c.metrics);
    let s = &c.scores;
    tx.execute(
        "INSERT INTO contents \
         (provider, provider_id, kind, title, description, url, tags, language, \
          views, likes, duration, reading_time, reactions, \
          base_score, type_multiplier, freshness_score, engagement_score, final_score, \
          published_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
                 ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
        params![
            c.provider,
            c.provider_id,
            c.kind().as_str(),
            c.title,
            c.description,
            c.url,
            c.tags,
            c.language,
            views,
            likes,
            duration,
            reading_time,
            reactions,
            s.base_score,
            s.type_multiplier,
            s.freshness_score,
            s.engagement_score,
            s.final_score,
            c.published_at,
            c.created_at,
            c.updated_at,
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column; `id`, `kind` and `created_at` stay.
fn update_row(tx: &rusqlite::Transaction<'_>, id: i64, c: &Content) -> rusqlite::Result<()> {
    let (views, likes, duration, reading_time, reactions) = metric_columns(&c.metrics);
    let s = &c.scores;
    tx.execute(
        "UPDATE contents SET \
         title = ?1, description = ?2, url = ?3, tags = ?4, language = ?5, \
         views = ?6, likes = ?7, duration = ?8, reading_time = ?9, reactions = ?10, \
         base_score = ?11, type_multiplier = ?12, freshness_score = ?13, \
         engagement_score = ?14, final_score = ?15, \
         published_at = ?16, updated_at = ?17 \
         WHERE id = ?18",
        params![
            c.title,
            c.description,
            c.url,
            c.tags,
            c.language,
            views,
            likes,
            duration,
            reading_time,
            reactions,
            s.base_score,
            s.type_multiplier,
            s.freshness_score,
            s.engagement_score,
            s.final_score,
            c.published_at,
            c.updated_at,
            id,
        ],
    )?;
    Ok(())
}

fn metric_columns(m: &Metrics) -> (i64, i64, i64, i64, i64) {
    match *m {
        Metrics::Video {
            views,
            likes,
            duration,
        } => (to_sql_int(views), to_sql_int(likes), to_sql_int(duration), 0, 0),
        Metrics::Text {
            reading_time,
            reactions,
        } => (0, 0, 0, to_sql_int(reading_time), to_sql_int(reactions)),
    }
}

fn row_to_content(row: &Row<'_>) -> rusqlite::Result<Content> {
    let kind: String = row.get(3)?;
    let metrics = match kind.as_str() {
        "video" => Metrics::Video {
            views: from_sql_int(row.get(9)?),
            likes: from_sql_int(row.get(10)?),
            duration: from_sql_int(row.get(11)?),
        },
        "text" => Metrics::Text {
            reading_time: from_sql_int(row.get(12)?),
            reactions: from_sql_int(row.get(13)?),
        },
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown content kind '{other}'").into(),
            ))
        }
    };
    let id: i64 = row.get(0)?;
    Ok(Content {
        id: Some(from_sql_int(id)),
        provider: row.get(1)?,
        provider_id: row.get(2)?,
        title: row.get(4)?,
        description: row.get(5)?,
        url: row.get(6)?,
        tags: row.get(7)?,
        language: row.get(8)?,
        metrics,
        scores: Scores {
            base_score: row.get(14)?,
            type_multiplier: row.get(15)?,
            freshness_score: row.get(16)?,
            engagement_score: row.get(17)?,
            final_score: row.get(18)?,
        },
        published_at: row.get(19)?,
        created_at: row.get(20)?,
        updated_at: row.get(21)?,
        deleted_at: row.get(22)?,
    })
}

/// `%needle%` with LIKE wildcards escaped.
fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn to_sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn from_sql_int(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}
