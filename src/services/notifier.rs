use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Channel, Video};

const NEW_VIDEO_COLOR: u32 = 0xd93025;
const SETUP_COLOR: u32 = 0x00c853;

/// Outbound notifications. Callers treat every failure as non-fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_video(&self, channel: &Channel, video: &Video) -> Result<()>;
    async fn notify_setup_complete(&self, channel_count: i64, video_count: i64) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct WebhookMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<EmbedAuthor>,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbedAuthor {
    name: String,
}

#[derive(Debug, Serialize)]
struct EmbedImage {
    url: String,
}

/// Posts embeds to a chat webhook. Without a URL every call is a no-op.
pub struct WebhookNotifier {
    client: Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            webhook_url: webhook_url.filter(|url| !url.is_empty()),
        }
    }

    async fn send(&self, message: WebhookMessage) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };

        let response = self.client.post(url).json(&message).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Other(anyhow::anyhow!(
                "Webhook rejected notification: HTTP {} {}",
                status,
                error_text
            )));
        }
        Ok(())
    }
}

pub fn video_url(video_id: &str, is_short: bool) -> String {
    if is_short {
        format!("https://www.youtube.com/shorts/{}", video_id)
    } else {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
}

fn video_embed(channel: &Channel, video: &Video) -> Embed {
    Embed {
        author: Some(EmbedAuthor {
            name: channel.title.clone(),
        }),
        title: video.title.clone(),
        url: Some(video_url(&video.id, video.is_short)),
        description: None,
        color: NEW_VIDEO_COLOR,
        image: video
            .thumbnail_url
            .clone()
            .map(|url| EmbedImage { url }),
        timestamp: video.published_at.map(|t| t.to_rfc3339()),
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_new_video(&self, channel: &Channel, video: &Video) -> Result<()> {
        self.send(WebhookMessage {
            embeds: vec![video_embed(channel, video)],
        })
        .await
    }

    async fn notify_setup_complete(&self, channel_count: i64, video_count: i64) -> Result<()> {
        self.send(WebhookMessage {
            embeds: vec![Embed {
                author: None,
                title: "Initial setup complete".to_string(),
                url: None,
                description: Some(format!(
                    "Fetched {} videos from {} channels",
                    video_count, channel_count
                )),
                color: SETUP_COLOR,
                image: None,
                timestamp: Some(Utc::now().to_rfc3339()),
            }],
        })
        .await
    }
}
