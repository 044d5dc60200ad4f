use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub upload_playlist_id: String,
    /// Stored for the UI; lanes are chosen by `fast_lane` alone.
    #[allow(dead_code)]
    pub show_livestreams: bool,
    pub fast_lane: bool,
    /// `None` until the first successful ingestion pass.
    pub last_fetched_at: Option<DateTime<Utc>>,
    #[allow(dead_code)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

impl NewChannel {
    pub fn upload_playlist_id(&self) -> String {
        upload_collection_id(&self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFilter {
    All,
    FastLane(bool),
}

/// `UCxxxx` channel ids map onto the `UUxxxx` uploads playlist.
pub fn upload_collection_id(channel_id: &str) -> String {
    swap_prefix("UU", channel_id)
}

/// Unofficial playlist holding only a channel's shorts.
pub fn shorts_collection_id(channel_id: &str) -> String {
    swap_prefix("UUSH", channel_id)
}

fn swap_prefix(prefix: &str, channel_id: &str) -> String {
    format!("{}{}", prefix, channel_id.get(2..).unwrap_or_default())
}
