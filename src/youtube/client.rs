use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::shorts_collection_id;

use super::{ApiError, RetryExecutor, Subscription, UploadItem, VideoDetails, VideoSource};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const PAGE_SIZE: u32 = 50;
/// Upper bound on ids per `videos.list` call.
const DETAILS_BATCH: usize = 50;
const SHORTS_PAGE_SIZE: u32 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    channel_id: Option<String>,
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    snippet: SubscriptionSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    resource_id: ResourceId,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    #[serde(default)]
    title: String,
    published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    resource_id: ResourceId,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    content_details: Option<ContentDetails>,
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    actual_end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// YouTube Data API v3 client. Every request goes through the retry executor.
pub struct YouTubeClient {
    client: Client,
    retry: RetryExecutor,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(retry: RetryExecutor) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("subfeed/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            retry,
            base_url: YOUTUBE_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        token: &str,
        resource: &str,
    ) -> Result<T, ApiError> {
        self.retry
            .execute(move || self.get_once::<T>(endpoint, query, token, resource))
            .await
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        token: &str,
        resource: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let envelope: ErrorEnvelope = response.json().await.unwrap_or_default();
            let reason = envelope
                .error
                .errors
                .into_iter()
                .find_map(|detail| detail.reason);
            return Err(ApiError::from_response(
                status.as_u16(),
                reason,
                envelope.error.message,
                resource,
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn list_playlist(
        &self,
        playlist_id: &str,
        token: &str,
        max: u32,
    ) -> Result<Vec<UploadItem>, ApiError> {
        let query = [
            ("part", "snippet".to_string()),
            ("playlistId", playlist_id.to_string()),
            ("maxResults", max.to_string()),
        ];
        let page: ListResponse<PlaylistItem> =
            self.get("playlistItems", &query, token, playlist_id).await?;

        let items = page
            .items
            .into_iter()
            .filter_map(|item| {
                let snippet = item.snippet;
                let video_id = snippet.resource_id.video_id?;
                Some(UploadItem {
                    video_id,
                    title: snippet.title,
                    thumbnail_url: snippet
                        .thumbnails
                        .medium
                        .or(snippet.thumbnails.default)
                        .map(|t| t.url),
                    published_at: snippet.published_at,
                })
            })
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn list_subscriptions(&self, token: &str) -> Result<Vec<Subscription>, ApiError> {
        let mut subscriptions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "snippet".to_string()),
                ("mine", "true".to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
            ];
            if let Some(page_token) = page_token.take() {
                query.push(("pageToken", page_token));
            }

            let page: ListResponse<SubscriptionItem> =
                self.get("subscriptions", &query, token, "subscriptions").await?;

            subscriptions.extend(page.items.into_iter().filter_map(|item| {
                let snippet = item.snippet;
                Some(Subscription {
                    channel_id: snippet.resource_id.channel_id?,
                    title: snippet.title,
                    thumbnail_url: snippet.thumbnails.default.map(|t| t.url),
                })
            }));

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Fetched {} subscriptions", subscriptions.len());
        Ok(subscriptions)
    }

    async fn list_recent_uploads(
        &self,
        playlist_id: &str,
        token: &str,
        max: u32,
    ) -> Result<Vec<UploadItem>, ApiError> {
        self.list_playlist(playlist_id, token, max).await
    }

    async fn list_video_details(
        &self,
        video_ids: &[String],
        token: &str,
    ) -> Result<Vec<VideoDetails>, ApiError> {
        let mut details = Vec::with_capacity(video_ids.len());

        for batch in video_ids.chunks(DETAILS_BATCH) {
            let query = [
                ("part", "contentDetails,liveStreamingDetails".to_string()),
                ("id", batch.join(",")),
            ];
            let page: ListResponse<VideoItem> = self.get("videos", &query, token, "videos").await?;

            details.extend(page.items.into_iter().map(|item| VideoDetails {
                id: item.id,
                duration: item
                    .content_details
                    .and_then(|c| c.duration)
                    .unwrap_or_else(|| "PT0S".to_string()),
                is_livestream: item.live_streaming_details.is_some(),
                livestream_ended_at: item.live_streaming_details.and_then(|l| l.actual_end_time),
            }));
        }

        Ok(details)
    }

    async fn list_shorts_collection(&self, channel_id: &str, token: &str) -> Vec<String> {
        let playlist_id = shorts_collection_id(channel_id);
        match self.list_playlist(&playlist_id, token, SHORTS_PAGE_SIZE).await {
            Ok(items) => items.into_iter().map(|item| item.video_id).collect(),
            Err(e) => {
                tracing::debug!("Shorts playlist {} unavailable: {}", playlist_id, e);
                Vec::new()
            }
        }
    }
}
