// src/ingest/providers/xml_articles.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::content::{Content, Metrics};
use crate::error::{ContentError, Result};
use crate::ingest::http::fetch_body;
use crate::ingest::types::ContentProvider;

pub const NAME: &str = "xml_provider";
const ROOT: &str = "articles";

#[derive(Debug, Deserialize)]
struct Articles {
    #[serde(rename = "article", default)]
    article: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    reading_time: u64,
    #[serde(default)]
    reactions: u64,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    language: String,
    published_at: String,
}

/// The serde layer ignores the root name, so a well-formed page of any other
/// shape would decode as an empty feed.
fn ensure_root(text: &str) -> Result<()> {
    let mut reader = Reader::from_str(text);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.name();
                if name.as_ref() == ROOT.as_bytes() {
                    return Ok(());
                }
                return Err(ContentError::decode(
                    NAME,
                    format!(
                        "expected <{ROOT}> root, found <{}>",
                        String::from_utf8_lossy(name.as_ref())
                    ),
                ));
            }
            Ok(Event::Eof) => {
                return Err(ContentError::decode(NAME, "document has no root element"))
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ContentError::decode(
                    NAME,
                    format!("failed to unmarshal XML: {e}"),
                ))
            }
        }
    }
}

fn parse_rfc3339(ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ContentError::decode(NAME, format!("invalid published_at '{ts}': {e}")))
}

/// Article feed served as `<articles><article>...</article></articles>`.
pub struct XmlArticleProvider {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl XmlArticleProvider {
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
        let text = std::str::from_utf8(body)
            .map_err(|e| ContentError::decode(NAME, format!("body is not UTF-8: {e}")))?;
        ensure_root(text)?;
        let doc: Articles = from_str(text)
            .map_err(|e| ContentError::decode(NAME, format!("failed to unmarshal XML: {e}")))?;

        let now = Utc::now();
        let mut out = Vec::with_capacity(doc.article.len());
        for a in doc.article {
            out.push(Content {
                id: None,
                provider: String::new(),
                published_at: parse_rfc3339(&a.published_at)?,
                provider_id: a.id,
                title: a.title,
                description: a.description,
                url: a.url,
                tags: a.tags,
                language: a.language,
                metrics: Metrics::Text {
                    reading_time: a.reading_time,
                    reactions: a.reactions,
                },
                scores: Default::default(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
        }

        histogram!("ingest_parse_ms", "provider" => NAME)
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(out)
    }
}

#[async_trait]
impl ContentProvider for XmlArticleProvider {
    fn name(&self) -> &str {
        NAME
    }

    async fn fetch_content(&self, cancel: &CancellationToken) -> Result<Vec<Content>> {
        let body = fetch_body(
            &self.client,
            NAME,
            &self.url,
            "application/xml",
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
