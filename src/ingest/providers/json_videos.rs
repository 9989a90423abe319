// src/ingest/providers/json_videos.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::content::{Content, Metrics};
use crate::error::{ContentError, Result};
use crate::ingest::http::fetch_body;
use crate::ingest::types::ContentProvider;

pub const NAME: &str = "json_provider";

#[derive(Debug, Deserialize)]
struct VideoFeed {
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    views: u64,
    #[serde(default)]
    likes: u64,
    #[serde(default)]
    duration: u64,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    language: String,
    published_at: DateTime<Utc>,
}

/// Video feed served as `{"videos": [...]}`.
pub struct JsonVideoProvider {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl JsonVideoProvider {
    pub fn new(url: impl Into<String>, timeout: Duration, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            timeout,
            client,
        }
    }

    /// Decode a raw payload into unsaved `Content` items (provider left empty).
    pub fn parse_payload(body: &[u8]) -> Result<Vec<Content>> {
        let t0 = std::time::Instant::now();
        let feed: VideoFeed = serde_json::from_slice(body)
            .map_err(|e| ContentError::decode(NAME, format!("failed to unmarshal JSON: {e}")))?;

        let now = Utc::now();
        let out = feed
            .videos
            .into_iter()
            .map(|v| Content {
                id: None,
                provider: String::new(),
                provider_id: v.id,
                title: v.title,
                description: v.description,
                url: v.url,
                tags: v.tags,
                language: v.language,
                metrics: Metrics::Video {
                    views: v.views,
                    likes: v.likes,
                    duration: v.duration,
                },
                scores: Default::default(),
                published_at: v.published_at,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .collect::<Vec<_>>();

        histogram!("ingest_parse_ms", "provider" => NAME)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl ContentProvider for JsonVideoProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch_content(&self, cancel: &CancellationToken) -> Result<Vec<Content>> {
        let body = fetch_body(
            &self.client,
            NAME,
            &self.url,
            "application/json",
            self.timeout,
            cancel,
        )
        .await?;
        Self::parse_payload(&body)
    }

    fn source_url(&self) -> &str {
        &self.url
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;

    #[test]
    fn maps_fields_and_keeps_order() {
        let body = br#"{"videos":[
            {"id":"video_1","title":"Go Tutorial","description":"basics","url":"https://e.com/1",
             "views":15000,"likes":1200,"duration":1800,"tags":"go,tutorial","language":"en",
             "published_at":"2024-05-01T10:00:00Z"},
            {"id":"video_2","title":"Second","views":10,"published_at":"2024-05-02T10:00:00+02:00"}
        ]}"#;
        let items = JsonVideoProvider::parse_payload(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].provider_id, "video_1");
        assert_eq!(items[1].provider_id, "video_2");
        assert!(items.iter().all(|c| c.kind() == ContentKind::Video));
        assert!(items.iter().all(|c| c.provider.is_empty() && c.id.is_none()));
        assert_eq!(
            items[0].metrics,
            Metrics::Video {
                views: 15000,
                likes: 1200,
                duration: 1800
            }
        );
        assert_eq!(items[1].published_at.to_rfc3339(), "2024-05-02T08:00:00+00:00");
        assert_eq!(items[0].created_at, items[0].updated_at);
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let err = JsonVideoProvider::parse_payload(b"{\"videos\": [").unwrap_err();
        assert!(matches!(err, ContentError::Decode { .. }));
        let err = JsonVideoProvider::parse_payload(br#"{"items":[]}"#).unwrap_err();
        assert!(matches!(err, ContentError::Decode { .. }));
    }
}
