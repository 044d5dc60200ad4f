//! Hand-written fakes for the collaborator traits, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::cache::Cache;
use crate::db::{Repository, Store};
use crate::error::{AppError, Result};
use crate::feed::{FeedEntry, FeedSource};
use crate::models::{Channel, Credential, NewChannel, Video};
use crate::quota::QuotaState;
use crate::services::{CredentialRefresher, Notifier, RefreshedToken};
use crate::sync::{
    ChannelSyncer, FeedPrefilter, LivestreamMonitor, Pipeline, TokenProvider, VideoIngestor,
};
use crate::youtube::{ApiError, Subscription, UploadItem, VideoDetails, VideoSource};

pub enum Uploads {
    Items(Vec<UploadItem>),
    NotFound,
    Fail,
    Quota,
}

#[derive(Default)]
pub struct FakeSource {
    pub subscriptions: Mutex<Vec<Subscription>>,
    uploads: Mutex<HashMap<String, Uploads>>,
    details: Mutex<HashMap<String, VideoDetails>>,
    shorts: Mutex<HashMap<String, Vec<String>>>,
    pub fail_details: Mutex<bool>,
    pub subscription_calls: AtomicU32,
    pub upload_calls: AtomicU32,
    pub detail_calls: AtomicU32,
    pub shorts_calls: AtomicU32,
}

impl FakeSource {
    pub fn set_subscriptions(&self, ids: &[&str]) {
        *self.subscriptions.lock().unwrap() = ids
            .iter()
            .map(|id| Subscription {
                channel_id: id.to_string(),
                title: format!("Channel {}", id),
                thumbnail_url: None,
            })
            .collect();
    }

    pub fn set_uploads(&self, playlist_id: &str, uploads: Uploads) {
        self.uploads
            .lock()
            .unwrap()
            .insert(playlist_id.to_string(), uploads);
    }

    pub fn set_details(&self, details: VideoDetails) {
        self.details
            .lock()
            .unwrap()
            .insert(details.id.clone(), details);
    }

    pub fn set_shorts(&self, channel_id: &str, ids: &[&str]) {
        self.shorts.lock().unwrap().insert(
            channel_id.to_string(),
            ids.iter().map(|id| id.to_string()).collect(),
        );
    }
}

#[async_trait]
impl VideoSource for FakeSource {
    async fn list_subscriptions(&self, _token: &str) -> std::result::Result<Vec<Subscription>, ApiError> {
        self.subscription_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.subscriptions.lock().unwrap().clone())
    }

    async fn list_recent_uploads(
        &self,
        playlist_id: &str,
        _token: &str,
        max: u32,
    ) -> std::result::Result<Vec<UploadItem>, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        match self.uploads.lock().unwrap().get(playlist_id) {
            Some(Uploads::Items(items)) => Ok(items.iter().take(max as usize).cloned().collect()),
            Some(Uploads::NotFound) => Err(ApiError::CollectionNotFound(playlist_id.to_string())),
            Some(Uploads::Fail) => Err(ApiError::Status {
                status: 500,
                reason: None,
                message: "backend error".to_string(),
            }),
            Some(Uploads::Quota) => Err(ApiError::QuotaExceeded),
            None => Ok(Vec::new()),
        }
    }

    async fn list_video_details(
        &self,
        video_ids: &[String],
        _token: &str,
    ) -> std::result::Result<Vec<VideoDetails>, ApiError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_details.lock().unwrap() {
            return Err(ApiError::Decode("broken".to_string()));
        }
        let details = self.details.lock().unwrap();
        Ok(video_ids
            .iter()
            .filter_map(|id| details.get(id).cloned())
            .collect())
    }

    async fn list_shorts_collection(&self, channel_id: &str, _token: &str) -> Vec<String> {
        self.shorts_calls.fetch_add(1, Ordering::SeqCst);
        self.shorts
            .lock()
            .unwrap()
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct FakeFeed {
    entries: Mutex<HashMap<String, Vec<FeedEntry>>>,
}

impl FakeFeed {
    pub fn set_entries(&self, channel_id: &str, video_ids: &[&str]) {
        let entries = video_ids
            .iter()
            .map(|id| FeedEntry {
                video_id: id.to_string(),
                title: format!("Video {}", id),
                published_at: None,
            })
            .collect();
        self.entries
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), entries);
    }
}

#[async_trait]
impl FeedSource for FakeFeed {
    async fn fetch_feed(&self, channel_id: &str) -> Vec<FeedEntry> {
        self.entries
            .lock()
            .unwrap()
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub videos: Mutex<Vec<String>>,
    pub setup: Mutex<Option<(i64, i64)>>,
    pub fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn video_ids(&self) -> Vec<String> {
        self.videos.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_new_video(&self, _channel: &Channel, video: &Video) -> Result<()> {
        self.videos.lock().unwrap().push(video.id.clone());
        if *self.fail.lock().unwrap() {
            return Err(AppError::Other(anyhow::anyhow!("webhook down")));
        }
        Ok(())
    }

    async fn notify_setup_complete(&self, channel_count: i64, video_count: i64) -> Result<()> {
        *self.setup.lock().unwrap() = Some((channel_count, video_count));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRefresher {
    pub response: Mutex<Option<RefreshedToken>>,
    pub calls: AtomicU32,
}

impl FakeRefresher {
    pub fn returning(access_token: &str, expires_in: i64) -> Self {
        Self {
            response: Mutex::new(Some(RefreshedToken {
                access_token: access_token.to_string(),
                expires_in,
            })),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CredentialRefresher for FakeRefresher {
    async fn refresh(&self, _refresh_token: &str) -> Result<RefreshedToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::Refresh("invalid_grant".to_string()))
    }
}

pub fn upload(video_id: &str, title: &str) -> UploadItem {
    UploadItem {
        video_id: video_id.to_string(),
        title: title.to_string(),
        thumbnail_url: Some(format!("https://i.ytimg.com/vi/{}/default.jpg", video_id)),
        published_at: Some(Utc::now()),
    }
}

pub fn details(video_id: &str, duration: &str) -> VideoDetails {
    VideoDetails {
        id: video_id.to_string(),
        duration: duration.to_string(),
        is_livestream: false,
        livestream_ended_at: None,
    }
}

pub async fn add_channel(store: &dyn Store, id: &str, last_fetched_at: Option<DateTime<Utc>>) {
    store
        .insert_channel(NewChannel {
            id: id.to_string(),
            title: format!("Channel {}", id),
            thumbnail_url: None,
        })
        .await
        .unwrap();
    if let Some(at) = last_fetched_at {
        store.set_last_fetched_at(id, at).await.unwrap();
    }
}

/// Wired-up pipeline over an in-memory store, holding a token valid for an hour.
pub struct Harness {
    pub store: Arc<Repository>,
    pub source: Arc<FakeSource>,
    pub feed: Arc<FakeFeed>,
    pub notifier: Arc<RecordingNotifier>,
    pub cache: Arc<Cache<Vec<String>>>,
    pub quota: Arc<QuotaState>,
    pub pipeline: Pipeline,
}

impl Harness {
    pub async fn new() -> Self {
        let store = Arc::new(Repository::in_memory().await.unwrap());
        store
            .save_credential(Credential {
                access_token: Some("access".to_string()),
                refresh_token: Some("refresh".to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
            })
            .await
            .unwrap();

        let source = Arc::new(FakeSource::default());
        let feed = Arc::new(FakeFeed::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let refresher = Arc::new(FakeRefresher::default());
        let cache = Arc::new(Cache::new());
        let quota = Arc::new(QuotaState::new());

        let pipeline = Pipeline {
            store: store.clone(),
            quota: quota.clone(),
            cache: cache.clone(),
            notifier: notifier.clone(),
            tokens: Arc::new(TokenProvider::new(store.clone(), refresher)),
            syncer: Arc::new(ChannelSyncer::new(store.clone(), source.clone())),
            ingestor: Arc::new(VideoIngestor::new(
                store.clone(),
                source.clone(),
                cache.clone(),
                notifier.clone(),
                10,
            )),
            livestreams: Arc::new(LivestreamMonitor::new(store.clone(), source.clone())),
            prefilter: Arc::new(FeedPrefilter::new(store.clone(), feed.clone())),
        };

        Self {
            store,
            source,
            feed,
            notifier,
            cache,
            quota,
            pipeline,
        }
    }
}
