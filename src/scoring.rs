//! Composite relevance score.
//!
//! final = base * type_multiplier + freshness + engagement
//!
//! - base       : video `views/1000 + likes/100`, text `reading_time + reactions/50`
//! - multiplier : video 1.5, text 1.0
//! - freshness  : step function of age in fractional days (<=7 → 5, <=30 → 3, <=90 → 1, else 0)
//! - engagement : video `likes/views * 10`, text `reactions/reading_time * 5` (0 on a zero denominator)
//!
//! Everything is plain `f64` arithmetic with no rounding. `now` is always passed
//! in so the functions stay pure.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::content::{Content, ContentKind, Metrics, Scores};

const MS_PER_DAY: f64 = 86_400_000.0;

pub fn base_score(metrics: &Metrics) -> f64 {
    match *metrics {
        Metrics::Video { views, likes, .. } => views as f64 / 1000.0 + likes as f64 / 100.0,
        Metrics::Text {
            reading_time,
            reactions,
        } => reading_time as f64 + reactions as f64 / 50.0,
    }
}

pub fn type_multiplier(kind: ContentKind) -> f64 {
    match kind {
        ContentKind::Video => 1.5,
        ContentKind::Text => 1.0,
    }
}

/// Age in days, keeping the fractional part. Negative for future timestamps.
pub fn age_in_days(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - published_at).num_milliseconds() as f64 / MS_PER_DAY
}

pub fn freshness_for_age(days: f64) -> f64 {
    if days <= 7.0 {
        5.0
    } else if days <= 30.0 {
        3.0
    } else if days <= 90.0 {
        1.0
    } else {
        0.0
    }
}

pub fn freshness_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    freshness_for_age(age_in_days(published_at, now))
}

pub fn engagement_score(metrics: &Metrics) -> f64 {
    match *metrics {
        Metrics::Video { views, likes, .. } => {
            if views > 0 {
                likes as f64 / views as f64 * 10.0
            } else {
                0.0
            }
        }
        Metrics::Text {
            reading_time,
            reactions,
        } => {
            if reading_time > 0 {
                reactions as f64 / reading_time as f64 * 5.0
            } else {
                0.0
            }
        }
    }
}

/// Compute all sub-scores for a snapshot without touching it.
pub fn score(content: &Content, now: DateTime<Utc>) -> Scores {
    let base_score = base_score(&content.metrics);
    let type_multiplier = type_multiplier(content.kind());
    let freshness_score = freshness_score(content.published_at, now);
    let engagement_score = engagement_score(&content.metrics);
    Scores {
        base_score,
        type_multiplier,
        freshness_score,
        engagement_score,
        final_score: base_score * type_multiplier + freshness_score + engagement_score,
    }
}

/// Stamp fresh scores onto `content`.
pub fn calculate_score(content: &mut Content, now: DateTime<Utc>) {
    content.scores = score(content, now);
}

/// Score every item independently; no cross-item normalization.
pub fn calculate_scores(contents: &mut [Content], now: DateTime<Utc>) {
    for c in contents.iter_mut() {
        calculate_score(c, now);
    }
}

/// Recompute and return the five values as a labeled map (detail views).
pub fn score_breakdown(content: &mut Content, now: DateTime<Utc>) -> BTreeMap<&'static str, f64> {
    calculate_score(content, now);
    breakdown_map(&content.scores)
}

pub fn breakdown_map(s: &Scores) -> BTreeMap<&'static str, f64> {
    BTreeMap::from([
        ("base_score", s.base_score),
        ("type_multiplier", s.type_multiplier),
        ("freshness_score", s.freshness_score),
        ("engagement_score", s.engagement_score),
        ("final_score", s.final_score),
    ])
}

/// Scale to 0..100 against `max_score`. A zero maximum yields 0.
pub fn normalize(score: f64, max_score: f64) -> f64 {
    if max_score == 0.0 {
        return 0.0;
    }
    score / max_score * 100.0
}

/// Nominal ceiling per kind: base 100, freshness 5, engagement 10.
pub fn max_possible_score(kind: ContentKind) -> f64 {
    100.0 * type_multiplier(kind) + 5.0 + 10.0
}
