mod fetcher;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use fetcher::FeedFetcher;

/// One `<entry>` of a channel's public uploads feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub video_id: String,
    #[allow(dead_code)]
    pub title: String,
    #[allow(dead_code)]
    pub published_at: Option<DateTime<Utc>>,
}

/// Cheap, unauthenticated view of a channel's latest uploads.
///
/// Never fails: an empty list means "could not tell", not "no uploads".
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, channel_id: &str) -> Vec<FeedEntry>;
}
