mod client;
mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use client::YouTubeClient;
pub use retry::RetryExecutor;

const QUOTA_REASON: &str = "quotaExceeded";
const PLAYLIST_NOT_FOUND_REASON: &str = "playlistNotFound";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("YouTube API quota exceeded")]
    QuotaExceeded,

    #[error("Playlist {0} not found")]
    CollectionNotFound(String),

    #[error("YouTube API error {status}: {message}")]
    Status {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    #[error("YouTube API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected YouTube API response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-2xx response by status and the first `errors[].reason`.
    pub fn from_response(status: u16, reason: Option<String>, message: String, resource: &str) -> Self {
        match (status, reason.as_deref()) {
            (403, Some(QUOTA_REASON)) => ApiError::QuotaExceeded,
            (404, Some(PLAYLIST_NOT_FOUND_REASON)) => ApiError::CollectionNotFound(resource.to_string()),
            _ => ApiError::Status {
                status,
                reason,
                message,
            },
        }
    }

    pub fn is_quota(&self) -> bool {
        match self {
            ApiError::QuotaExceeded => true,
            ApiError::Status { reason, .. } => reason.as_deref() == Some(QUOTA_REASON),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub channel_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDetails {
    pub id: String,
    pub duration: String,
    pub is_livestream: bool,
    pub livestream_ended_at: Option<DateTime<Utc>>,
}

/// Authenticated read access to the upstream video API.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Every subscription of the authenticated user, all pages.
    async fn list_subscriptions(&self, token: &str) -> Result<Vec<Subscription>, ApiError>;

    /// Up to `max` most recent entries of an uploads playlist.
    async fn list_recent_uploads(
        &self,
        playlist_id: &str,
        token: &str,
        max: u32,
    ) -> Result<Vec<UploadItem>, ApiError>;

    async fn list_video_details(
        &self,
        video_ids: &[String],
        token: &str,
    ) -> Result<Vec<VideoDetails>, ApiError>;

    /// Video ids in the channel's shorts playlist. Empty when it cannot be read.
    async fn list_shorts_collection(&self, channel_id: &str, token: &str) -> Vec<String>;
}
