use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Store;
use crate::error::Result;
use crate::feed::FeedSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCheck {
    pub has_new_videos: bool,
    pub new_video_ids: Vec<String>,
}

/// Quota-free check of whether a channel's public feed shows anything unseen.
pub struct FeedPrefilter {
    store: Arc<dyn Store>,
    feed: Arc<dyn FeedSource>,
}

impl FeedPrefilter {
    pub fn new(store: Arc<dyn Store>, feed: Arc<dyn FeedSource>) -> Self {
        Self { store, feed }
    }

    /// An empty feed is inconclusive and reports new videos so the caller
    /// falls back to the authenticated path.
    pub async fn check(&self, channel_id: &str) -> Result<FeedCheck> {
        let entries = self.feed.fetch_feed(channel_id).await;
        if entries.is_empty() {
            tracing::debug!("Feed for {} empty or unreadable, falling back to API", channel_id);
            return Ok(FeedCheck {
                has_new_videos: true,
                new_video_ids: Vec::new(),
            });
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = entries
            .into_iter()
            .map(|entry| entry.video_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let known = self.store.existing_video_ids(&ids).await?;
        let new_video_ids: Vec<String> = ids.into_iter().filter(|id| !known.contains(id)).collect();

        Ok(FeedCheck {
            has_new_videos: !new_video_ids.is_empty(),
            new_video_ids,
        })
    }
}
