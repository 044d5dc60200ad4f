use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use url::Url;

use crate::error::Result;

use super::{FeedEntry, FeedSource};

const FEED_URL: &str = "https://www.youtube.com/feeds/videos.xml";
const VIDEO_ID_PREFIX: &str = "yt:video:";

pub struct FeedFetcher {
    client: Client,
    base_url: String,
}

impl FeedFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("subfeed/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: FEED_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn try_fetch(&self, channel_id: &str) -> Result<Vec<FeedEntry>> {
        let url = Url::parse_with_params(&self.base_url, &[("channel_id", channel_id)])
            .map_err(|e| anyhow::anyhow!("Invalid feed URL: {}", e))?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        parse_feed(&bytes)
    }
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch_feed(&self, channel_id: &str) -> Vec<FeedEntry> {
        match self.try_fetch(channel_id).await {
            Ok(entries) => {
                tracing::debug!("Feed for {} listed {} entries", channel_id, entries.len());
                entries
            }
            Err(e) => {
                tracing::debug!("Feed for {} unavailable: {}", channel_id, e);
                Vec::new()
            }
        }
    }
}

/// Parse a channel uploads feed, keeping only entries that carry a video id.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<FeedEntry>> {
    let feed = parser::parse(bytes).map_err(|e| anyhow::anyhow!("Invalid feed: {}", e))?;

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let video_id = entry.id.strip_prefix(VIDEO_ID_PREFIX)?.trim();
            if video_id.is_empty() {
                return None;
            }
            Some(FeedEntry {
                video_id: video_id.to_string(),
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                published_at: entry.published.or(entry.updated),
            })
        })
        .collect();

    Ok(entries)
}
