use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::cache::Cache;
use crate::db::Store;
use crate::duration::is_short_duration;
use crate::error::Result;
use crate::models::{Channel, NewVideo, VideoDetailsUpdate};
use crate::services::Notifier;
use crate::youtube::{ApiError, VideoSource};

/// Key prefix for memoised shorts-collection membership, one entry per channel.
pub const SHORTS_CACHE_PREFIX: &str = "shorts:";
const SHORTS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Pulls a channel's latest uploads into the store.
pub struct VideoIngestor {
    store: Arc<dyn Store>,
    source: Arc<dyn VideoSource>,
    cache: Arc<Cache<Vec<String>>>,
    notifier: Arc<dyn Notifier>,
    recent_uploads: u32,
}

impl VideoIngestor {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn VideoSource>,
        cache: Arc<Cache<Vec<String>>>,
        notifier: Arc<dyn Notifier>,
        recent_uploads: u32,
    ) -> Self {
        Self {
            store,
            source,
            cache,
            notifier,
            recent_uploads,
        }
    }

    /// Fetch, store and classify the channel's most recent uploads.
    ///
    /// Returns the ids that were not stored before this call. A channel whose
    /// upload collection is gone upstream is deleted along with its videos.
    pub async fn ingest(&self, channel_id: &str, token: &str, notify: bool) -> Result<Vec<String>> {
        let Some(channel) = self.store.get_channel(channel_id).await? else {
            return Ok(Vec::new());
        };

        let items = match self
            .source
            .list_recent_uploads(&channel.upload_playlist_id, token, self.recent_uploads)
            .await
        {
            Ok(items) => items,
            Err(ApiError::CollectionNotFound(playlist_id)) => {
                tracing::warn!(
                    "Upload playlist {} of channel {} no longer exists, removing channel",
                    playlist_id,
                    channel.id
                );
                self.store.delete_channel(&channel.id).await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = items
            .iter()
            .map(|item| item.video_id.clone())
            .filter(|id| seen.insert(id.clone()))
            .collect();
        let known = self.store.existing_video_ids(&ids).await?;

        for item in items {
            self.store
                .upsert_video(NewVideo {
                    id: item.video_id,
                    channel_id: channel.id.clone(),
                    title: item.title,
                    thumbnail_url: item.thumbnail_url,
                    published_at: item.published_at,
                })
                .await?;
        }

        let new_ids: Vec<String> = ids.into_iter().filter(|id| !known.contains(id)).collect();
        if !new_ids.is_empty() {
            self.apply_details(&channel, &new_ids, token).await?;
        }

        self.store.set_last_fetched_at(&channel.id, Utc::now()).await?;

        if notify {
            self.notify_new(&channel, &new_ids).await;
        }

        Ok(new_ids)
    }

    async fn apply_details(&self, channel: &Channel, new_ids: &[String], token: &str) -> Result<()> {
        // Details are best-effort; the rows are already stored.
        let details = match self.source.list_video_details(new_ids, token).await {
            Ok(details) => details,
            Err(e) => {
                tracing::warn!("Failed to fetch details for {} new video(s) of {}: {}", new_ids.len(), channel.id, e);
                return Ok(());
            }
        };

        for detail in details {
            let is_short = is_short_duration(&detail.duration)
                && self.shorts_of(&channel.id, token).await.contains(&detail.id);
            self.store
                .update_video_details(VideoDetailsUpdate {
                    id: detail.id,
                    duration: detail.duration,
                    is_livestream: detail.is_livestream,
                    livestream_ended_at: detail.livestream_ended_at,
                    is_short,
                })
                .await?;
        }
        Ok(())
    }

    async fn shorts_of(&self, channel_id: &str, token: &str) -> Vec<String> {
        let key = format!("{}{}", SHORTS_CACHE_PREFIX, channel_id);
        if let Some(ids) = self.cache.get(&key) {
            return ids;
        }
        let ids = self.source.list_shorts_collection(channel_id, token).await;
        self.cache.set(&key, ids.clone(), Some(SHORTS_CACHE_TTL));
        ids
    }

    async fn notify_new(&self, channel: &Channel, new_ids: &[String]) {
        for id in new_ids {
            let video = match self.store.get_video(id).await {
                Ok(Some(video)) => video,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!("Failed to load video {} for notification: {}", id, e);
                    continue;
                }
            };
            tracing::info!("New video from {}: {}", channel.title, video.title);
            if let Err(e) = self.notifier.notify_new_video(channel, &video).await {
                tracing::warn!("Failed to send notification for {}: {}", id, e);
            }
        }
    }
}
