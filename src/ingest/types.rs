// src/ingest/types.rs
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::content::Content;
use crate::error::Result;

/// One upstream source in its own wire format.
///
/// `fetch_content` returns items with `provider` left empty; the manager
/// stamps its registered name after a successful fetch.
#[async_trait::async_trait]
pub trait ContentProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch_content(&self, cancel: &CancellationToken) -> Result<Vec<Content>>;
    fn source_url(&self) -> &str;
    fn timeout(&self) -> Duration;
}

/// Provider listing returned to the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub url: String,
    pub timeout_secs: u64,
}

impl ProviderInfo {
    pub fn of(p: &dyn ContentProvider) -> Self {
        Self {
            name: p.name().to_string(),
            url: p.source_url().to_string(),
            timeout_secs: p.timeout().as_secs(),
        }
    }
}
