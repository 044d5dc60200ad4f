use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use super::{Pipeline, SHORTS_CACHE_PREFIX};
use crate::error::Result;
use crate::models::{Channel, ChannelFilter};

/// Pause after an empty lane or a failed tick.
const RETRY_DELAY: Duration = Duration::from_secs(60);
/// Pause between checks while no usable token is stored.
const TOKEN_WAIT: Duration = Duration::from_secs(60);

/// Parameters of one round-robin polling lane.
#[derive(Debug, Clone)]
pub struct LaneConfig {
    pub name: &'static str,
    pub filter: ChannelFilter,
    /// Time budget for visiting every channel of the lane once.
    pub cycle: Duration,
    pub clears_shorts_cache: bool,
    pub checks_livestreams: bool,
}

impl LaneConfig {
    pub fn normal(cycle: Duration) -> Self {
        Self {
            name: "normal",
            filter: ChannelFilter::FastLane(false),
            cycle,
            clears_shorts_cache: true,
            checks_livestreams: false,
        }
    }

    pub fn fast(cycle: Duration) -> Self {
        Self {
            name: "fast",
            filter: ChannelFilter::FastLane(true),
            cycle,
            clears_shorts_cache: false,
            checks_livestreams: true,
        }
    }
}

/// Drives the normal lane, the fast lane and the periodic subscription sync.
pub struct PollingScheduler {
    pipeline: Pipeline,
    normal: LaneConfig,
    fast: LaneConfig,
    sync_interval: Duration,
}

impl PollingScheduler {
    pub fn new(pipeline: Pipeline, normal: LaneConfig, fast: LaneConfig, sync_interval: Duration) -> Self {
        Self {
            pipeline,
            normal,
            fast,
            sync_interval,
        }
    }

    /// Runs for the lifetime of the process.
    pub async fn run(&self) {
        tracing::info!(
            "Scheduler started: normal cycle {:?}, fast cycle {:?}, sync every {:?}",
            self.normal.cycle,
            self.fast.cycle,
            self.sync_interval
        );
        futures::future::join3(
            self.run_lane(&self.normal),
            self.run_lane(&self.fast),
            self.run_sync(),
        )
        .await;
    }

    async fn run_lane(&self, lane: &LaneConfig) {
        let mut cursor = 0;
        loop {
            let delay = self.tick(lane, &mut cursor).await;
            tokio::time::sleep(delay).await;
        }
    }

    /// Visit one channel of the lane and return the delay before the next tick.
    async fn tick(&self, lane: &LaneConfig, cursor: &mut usize) -> Duration {
        let channels = match self.pipeline.store.list_channels(lane.filter).await {
            Ok(channels) => channels,
            Err(e) => {
                tracing::error!(lane = lane.name, "Failed to list channels: {}", e);
                return RETRY_DELAY;
            }
        };

        if channels.is_empty() {
            *cursor = 0;
            tracing::debug!(lane = lane.name, "No channels, idling");
            return RETRY_DELAY;
        }

        let count = channels.len();
        let channel = &channels[*cursor % count];
        tracing::debug!(lane = lane.name, channel = %channel.id, "Tick {}/{}", *cursor % count + 1, count);
        let outcome = self.visit(lane, channel).await;

        *cursor = *cursor % count + 1;
        if *cursor >= count {
            *cursor = 0;
            if lane.clears_shorts_cache {
                self.pipeline.cache.clear_prefix(SHORTS_CACHE_PREFIX);
                tracing::debug!(lane = lane.name, "Cycle complete, shorts cache cleared");
            }
        }

        match outcome {
            Ok(()) => lane.cycle / count as u32,
            Err(e) => {
                tracing::error!(lane = lane.name, channel = %channel.id, "Tick failed: {}", e);
                RETRY_DELAY
            }
        }
    }

    async fn visit(&self, lane: &LaneConfig, channel: &Channel) -> Result<()> {
        if channel.last_fetched_at.is_some() {
            let check = self.pipeline.prefilter.check(&channel.id).await?;
            if !check.has_new_videos {
                tracing::debug!(channel = %channel.id, "Feed unchanged, skipping API fetch");
                self.pipeline
                    .store
                    .set_last_fetched_at(&channel.id, Utc::now())
                    .await?;
                if lane.checks_livestreams {
                    if let Some(token) = self.pipeline.tokens.get_valid_token().await {
                        self.check_livestreams(&token).await;
                    }
                }
                return Ok(());
            }
        }

        let token = self.wait_for_token().await;
        self.wait_for_quota().await;

        let notify = channel.last_fetched_at.is_some();
        let ingested = self.pipeline.ingestor.ingest(&channel.id, &token, notify).await;
        if let Ok(new_ids) = &ingested {
            if !new_ids.is_empty() {
                tracing::info!(lane = lane.name, "{} new video(s) from {}", new_ids.len(), channel.title);
            }
        }

        if lane.checks_livestreams {
            self.check_livestreams(&token).await;
        }
        ingested.map(|_| ())
    }

    async fn check_livestreams(&self, token: &str) {
        if self.pipeline.quota.is_exceeded() {
            return;
        }
        if let Err(e) = self.pipeline.livestreams.check_open_livestreams(token).await {
            tracing::warn!("Livestream check failed: {}", e);
        }
    }

    async fn run_sync(&self) {
        let mut interval = tokio::time::interval(self.sync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let token = self.wait_for_token().await;
            self.wait_for_quota().await;
            match self.pipeline.syncer.sync(&token).await {
                Ok(result) => tracing::info!(
                    "Subscription sync: {} added, {} removed",
                    result.added,
                    result.removed
                ),
                Err(e) => tracing::error!("Subscription sync failed: {}", e),
            }
        }
    }

    async fn wait_for_token(&self) -> String {
        loop {
            if let Some(token) = self.pipeline.tokens.get_valid_token().await {
                return token;
            }
            tracing::warn!("No valid token available, retrying in {:?}", TOKEN_WAIT);
            tokio::time::sleep(TOKEN_WAIT).await;
        }
    }

    async fn wait_for_quota(&self) {
        while self.pipeline.quota.is_exceeded() {
            let wait = self
                .pipeline
                .quota
                .reset_at()
                .and_then(|reset_at| (reset_at - Utc::now()).to_std().ok())
                .unwrap_or(Duration::from_secs(1));
            tracing::info!("Quota exhausted, waiting {:?} for reset", wait);
            tokio::time::sleep(wait).await;
        }
    }
}
