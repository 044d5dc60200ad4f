use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// Raw ISO-8601 duration as reported upstream.
    pub duration: Option<String>,
    pub is_short: bool,
    pub is_livestream: bool,
    pub livestream_ended_at: Option<DateTime<Utc>>,
    #[allow(dead_code)]
    pub is_hidden: bool,
    #[allow(dead_code)]
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct VideoDetailsUpdate {
    pub id: String,
    pub duration: String,
    pub is_livestream: bool,
    pub livestream_ended_at: Option<DateTime<Utc>>,
    pub is_short: bool,
}
