// src/ingest/http.rs
//! Shared HTTP plumbing for provider adapters: one bounded GET per fetch,
//! raced against the refresh cancellation token. No retries here.

use std::time::Duration;

use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;

use crate::error::{ContentError, Result};

pub const USER_AGENT: &str = concat!("content-search/", env!("CARGO_PKG_VERSION"));

/// Client shared by every adapter the manager registers.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ContentError::fetch("http", format!("failed to build HTTP client: {e}")))
}

/// GET `url` and return the body bytes.
///
/// Transport errors, timeouts and non-2xx statuses map to `Fetch`; a
/// cancelled token aborts the in-flight request and yields `Cancelled`.
pub async fn fetch_body(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    accept: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let request = async {
        let resp = client
            .get(url)
            .header(ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ContentError::fetch(provider, format!("failed to make request: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ContentError::fetch(
                provider,
                format!("unexpected status code: {}", status.as_u16()),
            ));
        }

        let body = resp.bytes().await.map_err(|e| {
            ContentError::fetch(provider, format!("failed to read response body: {e}"))
        })?;
        Ok(body.to_vec())
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ContentError::Cancelled),
        res = request => res,
    }
}
