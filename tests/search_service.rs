// tests/search_service.rs
//
// SearchService end to end over the in-memory store with scripted providers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use content_search::content::{Content, ContentKind, KindFilter, Metrics};
use content_search::error::{ContentError, Result};
use content_search::ingest::types::ContentProvider;
use content_search::ingest::ProviderManager;
use content_search::search::SearchService;
use content_search::store::{ContentStore, MemoryStore, SqliteStore};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// Serves a fixed batch, or fails, or blocks until cancelled.
struct Scripted {
    name: &'static str,
    items: Vec<Content>,
    fail: bool,
    hang: bool,
    calls: AtomicUsize,
}

impl Scripted {
    fn ok(name: &'static str, items: Vec<Content>) -> Self {
        Self {
            name,
            items,
            fail: false,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::ok(name, vec![])
        }
    }

    fn hanging(name: &'static str) -> Self {
        Self {
            hang: true,
            ..Self::ok(name, vec![])
        }
    }
}

#[async_trait]
impl ContentProvider for Scripted {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch_content(&self, cancel: &CancellationToken) -> Result<Vec<Content>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            cancel.cancelled().await;
            return Err(ContentError::Cancelled);
        }
        if self.fail {
            return Err(ContentError::fetch(self.name, "unexpected status code: 500"));
        }
        Ok(self.items.clone())
    }

    fn source_url(&self) -> &str {
        "http://scripted.local"
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }
}

fn video(id: &str, views: u64, likes: u64, days_old: i64) -> Content {
    Content::new(
        id,
        Metrics::Video {
            views,
            likes,
            duration: 300,
        },
        Utc::now() - ChronoDuration::days(days_old),
    )
    .with_title(format!("Video {id}"))
    .with_tags("rust,video")
}

fn article(id: &str, reading_time: u64, reactions: u64, days_old: i64) -> Content {
    Content::new(
        id,
        Metrics::Text {
            reading_time,
            reactions,
        },
        Utc::now() - ChronoDuration::days(days_old),
    )
    .with_title(format!("Article {id}"))
    .with_description("long read about rust")
}

fn service(providers: Vec<Arc<dyn ContentProvider>>) -> (SearchService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let svc = SearchService::new(store.clone(), Arc::new(ProviderManager::new(providers)));
    (svc, store)
}

fn default_providers() -> Vec<Arc<dyn ContentProvider>> {
    vec![
        Arc::new(Scripted::ok(
            "json_provider",
            vec![video("v1", 1000, 50, 3), video("v2", 20_000, 900, 45)],
        )),
        Arc::new(Scripted::ok(
            "xml_provider",
            vec![article("a1", 10, 50, 10), article("a2", 0, 7, 200)],
        )),
    ]
}

#[tokio::test]
async fn refresh_scores_and_stores_every_item() {
    let (svc, store) = service(default_providers());
    let report = svc.refresh_content(&CancellationToken::new()).await.unwrap();
    assert_eq!((report.fetched, report.inserted, report.updated), (4, 4, 0));

    let v1 = store.find_by_identity("json_provider", "v1").await.unwrap();
    // base 1.5 * 1.5 + fresh 5 + engagement 0.5
    assert!((v1.scores.final_score - 7.75).abs() < 1e-9);

    let a2 = store.find_by_identity("xml_provider", "a2").await.unwrap();
    // zero reading time: base 0.14, freshness 0, engagement 0
    assert!((a2.scores.final_score - 0.14).abs() < 1e-9);

    let again = svc.refresh_content(&CancellationToken::new()).await.unwrap();
    assert_eq!((again.inserted, again.updated), (0, 4));
    let v1_again = store.find_by_identity("json_provider", "v1").await.unwrap();
    assert_eq!(v1.id, v1_again.id);
}

#[tokio::test]
async fn refresh_tolerates_a_failing_provider() {
    let (svc, _store) = service(vec![
        Arc::new(Scripted::failing("json_provider")),
        Arc::new(Scripted::ok("xml_provider", vec![article("a1", 5, 5, 1)])),
    ]);
    let report = svc.refresh_content(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.fetched, 1);

    let stats = svc.get_content_stats().await.unwrap();
    assert_eq!((stats.video_count, stats.text_count), (0, 1));
}

#[tokio::test]
async fn cancelled_refresh_writes_nothing() {
    let (svc, store) = service(vec![
        Arc::new(Scripted::ok("json_provider", vec![video("v1", 10, 1, 1)])),
        Arc::new(Scripted::hanging("xml_provider")),
    ]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = svc.refresh_content(&cancel).await.unwrap_err();
    assert!(matches!(err, ContentError::Cancelled));
    assert_eq!(store.stats().await.unwrap().total_content, 0);
}

#[tokio::test]
async fn concurrent_refreshes_do_not_duplicate_identities() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let svc = Arc::new(SearchService::new(
        store.clone(),
        Arc::new(ProviderManager::new(default_providers())),
    ));

    let handles = (0..4)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.refresh_content(&CancellationToken::new()).await })
        })
        .collect::<Vec<_>>();
    let mut inserted = 0;
    for h in handles {
        inserted += h.await.unwrap().unwrap().inserted;
    }
    assert_eq!(inserted, 4);
    assert_eq!(store.stats().await.unwrap().total_content, 4);
}

#[tokio::test]
async fn search_clamps_paging_and_ranks_results() {
    let (svc, _store) = service(default_providers());
    svc.refresh_content(&CancellationToken::new()).await.unwrap();

    let page = svc.search("", KindFilter::All, 0, 1_000).await.unwrap();
    assert_eq!((page.page, page.limit), (1, 10));
    assert_eq!(page.total, 4);
    let scores: Vec<f64> = page.contents.iter().map(|c| c.scores.final_score).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
    assert_eq!(page.contents[0].provider_id, "v2");

    let negative = svc.search("", KindFilter::All, -5, -1).await.unwrap();
    assert_eq!((negative.page, negative.limit), (1, 10));

    let texts = svc
        .search("RUST", KindFilter::Only(ContentKind::Text), 1, 1)
        .await
        .unwrap();
    assert_eq!((texts.total, texts.total_pages), (2, 2));
    assert!(texts.has_next);
    assert_eq!(texts.contents.len(), 1);
}

#[tokio::test]
async fn search_with_filters_reads_only_the_type_key() {
    let (svc, _store) = service(default_providers());
    svc.refresh_content(&CancellationToken::new()).await.unwrap();

    let mut filters = HashMap::from([
        ("type".to_string(), json!("video")),
        ("language".to_string(), json!("de")),
    ]);
    let videos = svc.search_with_filters("", &filters, 1, 10).await.unwrap();
    assert_eq!(videos.total, 2);
    assert!(videos.contents.iter().all(|c| c.kind() == ContentKind::Video));

    filters.insert("type".to_string(), json!("all"));
    assert_eq!(svc.search_with_filters("", &filters, 1, 10).await.unwrap().total, 4);

    filters.insert("type".to_string(), json!("podcast"));
    let err = svc.search_with_filters("", &filters, 1, 10).await.unwrap_err();
    assert!(matches!(err, ContentError::Validation(_)));

    let none = svc
        .search_with_filters("", &HashMap::new(), 1, 10)
        .await
        .unwrap();
    assert_eq!(none.total, 4);
}

#[tokio::test]
async fn lookups_recompute_scores_and_surface_not_found() {
    let (svc, store) = service(vec![]);
    // stored with zeroed scores on purpose
    store
        .bulk_upsert(vec![video("v1", 1000, 50, 3).with_provider("json_provider")])
        .await
        .unwrap();
    let id = store
        .find_by_identity("json_provider", "v1")
        .await
        .unwrap()
        .id
        .unwrap();

    let c = svc.get_content_by_id(id).await.unwrap();
    assert!((c.scores.final_score - 7.75).abs() < 1e-9);

    let detail = svc.get_content_detail(id).await.unwrap();
    assert_eq!(detail.score_breakdown["type_multiplier"], 1.5);
    assert_eq!(detail.score_breakdown["freshness_score"], 5.0);

    assert!(svc.get_content_by_id(id + 100).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn popular_uses_search_clamping() {
    let (svc, _store) = service(default_providers());
    svc.refresh_content(&CancellationToken::new()).await.unwrap();

    let top = svc.get_popular_content(2).await.unwrap();
    assert_eq!(top.len(), 2);
    assert!(top[0].scores.final_score >= top[1].scores.final_score);

    // out-of-range limits fall back to 10, which covers all four
    assert_eq!(svc.get_popular_content(0).await.unwrap().len(), 4);
    assert_eq!(svc.get_popular_content(101).await.unwrap().len(), 4);
}

#[tokio::test]
async fn providers_are_listed_in_registration_order() {
    let (svc, _store) = service(default_providers());
    let names: Vec<_> = svc.get_providers().into_iter().map(|p| p.name).collect();
    assert_eq!(names, ["json_provider", "xml_provider"]);
}
