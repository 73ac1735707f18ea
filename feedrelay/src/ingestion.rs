use anyhow::{Context, Result};
use common::{FeedConfig, FetchConfig};
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{redirect, Client};
use serde::Serialize;
use std::time::Duration;

use crate::extraction::{self, FeedItem};

const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml, */*";

/// Result of fetching one feed. `error` is set only when `ok` is false.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub source: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub items: Vec<FeedItem>,
}

impl FetchOutcome {
    fn success(source: &str, items: Vec<FeedItem>) -> Self {
        Self {
            source: source.to_string(),
            ok: true,
            error: None,
            items,
        }
    }

    fn failure(source: &str, error: String) -> Self {
        Self {
            source: source.to_string(),
            ok: false,
            error: Some(error),
            items: Vec::new(),
        }
    }
}

/// Build the shared outbound client: browser user agent, feed Accept header, redirects followed.
/// No timeout is set unless `fetch.timeout_seconds` is configured.
pub fn build_client(cfg: &FetchConfig) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));

    let mut builder = Client::builder()
        .user_agent(cfg.user_agent())
        .default_headers(headers)
        .redirect(redirect::Policy::limited(cfg.max_redirects()));

    if let Some(secs) = cfg.timeout_seconds {
        builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build().context("failed to build reqwest client")
}

/// Fetch the raw feed body. Non-2xx statuses are errors.
pub async fn fetch_feed_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await.context("failed to fetch feed")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("HTTP {}", status.as_u16()));
    }

    let body = response.text().await.context("failed to read response body")?;
    tracing::debug!(url, status = status.as_u16(), bytes = body.len(), "feed fetched");
    Ok(body)
}

/// One fetch attempt for one feed; every failure is captured in the outcome.
pub async fn fetch_feed(client: &Client, feed: &FeedConfig, limit: usize) -> FetchOutcome {
    match fetch_feed_text(client, &feed.url).await {
        Ok(body) => FetchOutcome::success(&feed.name, extraction::extract(&body, limit)),
        Err(e) => {
            let error = format!("{:#}", e);
            tracing::warn!(source = %feed.name, url = %feed.url, %error, "feed fetch failed");
            FetchOutcome::failure(&feed.name, error)
        }
    }
}

/// Fetch every feed concurrently and wait for all of them. Outcomes keep the input order.
pub async fn fetch_all(client: &Client, feeds: &[FeedConfig], limit: usize) -> Vec<FetchOutcome> {
    join_all(feeds.iter().map(|feed| fetch_feed(client, feed, limit))).await
}
