use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Channel, ChannelFilter, Credential, NewChannel, NewVideo, Video, VideoDetailsUpdate};

/// Everything the ingestion pipeline needs from persistent storage.
///
/// Deleting a channel must also delete its videos.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_channel(&self, id: &str) -> Result<Option<Channel>>;
    async fn insert_channel(&self, channel: NewChannel) -> Result<()>;
    async fn delete_channel(&self, id: &str) -> Result<()>;
    async fn channel_ids(&self) -> Result<Vec<String>>;
    /// Channels ordered by `last_fetched_at`, never-fetched first.
    async fn list_channels(&self, filter: ChannelFilter) -> Result<Vec<Channel>>;
    async fn set_fast_lane(&self, id: &str, fast_lane: bool) -> Result<bool>;
    async fn set_last_fetched_at(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Insert a new video, or refresh title/thumbnail when either changed.
    async fn upsert_video(&self, video: NewVideo) -> Result<()>;
    async fn get_video(&self, id: &str) -> Result<Option<Video>>;
    async fn existing_video_ids(&self, ids: &[String]) -> Result<HashSet<String>>;
    async fn update_video_details(&self, details: VideoDetailsUpdate) -> Result<()>;
    async fn open_livestream_ids(&self) -> Result<Vec<String>>;
    async fn set_livestream_ended(&self, id: &str, ended_at: DateTime<Utc>) -> Result<()>;

    async fn get_credential(&self) -> Result<Option<Credential>>;
    async fn save_credential(&self, credential: Credential) -> Result<()>;
    async fn set_access_token(&self, access_token: &str, expires_at: DateTime<Utc>) -> Result<()>;

    async fn count_channels(&self) -> Result<i64>;
    async fn count_videos(&self) -> Result<i64>;
}
