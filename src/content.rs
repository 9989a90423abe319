//! Unified content model shared by adapters, scoring, stores and the API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// Surrogate key assigned by a store on first insert.
pub type ContentId = u64;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Video,
    Text,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Text => "text",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(ContentKind::Video),
            "text" => Ok(ContentKind::Text),
            other => Err(ContentError::Validation(format!(
                "invalid content type '{other}'. Must be 'video', 'text', or 'all'"
            ))),
        }
    }
}

/// Kind-specific engagement counters. The variant fixes the content kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Metrics {
    Video {
        views: u64,
        likes: u64,
        /// Seconds.
        duration: u64,
    },
    Text {
        /// Minutes.
        reading_time: u64,
        reactions: u64,
    },
}

impl Metrics {
    pub fn kind(&self) -> ContentKind {
        match self {
            Metrics::Video { .. } => ContentKind::Video,
            Metrics::Text { .. } => ContentKind::Text,
        }
    }
}

/// Derived ranking values. A cache of `scoring::score`, never authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub base_score: f64,
    pub type_multiplier: f64,
    pub freshness_score: f64,
    pub engagement_score: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: Option<ContentId>,
    pub provider: String,
    pub provider_id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub tags: String,
    pub language: String,
    #[serde(flatten)]
    pub metrics: Metrics,
    #[serde(flatten)]
    pub scores: Scores,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Content {
    /// Fresh, unsaved item with empty descriptive fields and zeroed scores.
    pub fn new(
        provider_id: impl Into<String>,
        metrics: Metrics,
        published_at: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            provider: String::new(),
            provider_id: provider_id.into(),
            title: String::new(),
            description: String::new(),
            url: String::new(),
            tags: String::new(),
            language: String::new(),
            metrics,
            scores: Scores::default(),
            published_at,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = provider.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    pub fn kind(&self) -> ContentKind {
        self.metrics.kind()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Case-insensitive substring match over title, description and tags.
    /// `needle` must already be lowercase; an empty needle matches everything.
    pub fn matches_text(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self.tags.to_lowercase().contains(needle)
    }
}

/// Kind selector for queries. `""` and `"all"` select both kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Only(ContentKind),
}

impl KindFilter {
    pub fn matches(self, kind: ContentKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Only(k) => k == kind,
        }
    }
}

impl FromStr for KindFilter {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.is_empty() || t.eq_ignore_ascii_case("all") {
            return Ok(KindFilter::All);
        }
        t.parse::<ContentKind>().map(KindFilter::Only)
    }
}

/// A clamped, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// `page < 1` becomes 1; `limit` outside `[1, 100]` becomes 10.
    pub fn clamped(page: i64, limit: i64) -> Self {
        let page = if page < 1 {
            1
        } else {
            u32::try_from(page).unwrap_or(u32::MAX)
        };
        Self {
            page,
            limit: clamp_limit(limit),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.limit as usize)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

pub fn clamp_limit(limit: i64) -> u32 {
    if (1..=i64::from(MAX_PAGE_LIMIT)).contains(&limit) {
        limit as u32
    } else {
        DEFAULT_PAGE_LIMIT
    }
}

/// One ranked page plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub contents: Vec<Content>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl SearchPage {
    pub fn new(contents: Vec<Content>, total: u64, req: PageRequest) -> Self {
        let total_pages = total.div_ceil(u64::from(req.limit.max(1)));
        Self {
            contents,
            total,
            page: req.page,
            limit: req.limit,
            total_pages,
            has_next: u64::from(req.page) < total_pages,
            has_previous: req.page > 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStats {
    pub total_content: u64,
    pub video_count: u64,
    pub text_count: u64,
    pub last_updated: Option<DateTime<Utc>>,
}
