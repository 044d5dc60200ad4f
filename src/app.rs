use std::sync::Arc;

use chrono::Utc;

use crate::cache::{start_sweep, Cache};
use crate::config::Config;
use crate::db::{Repository, Store};
use crate::error::{AppError, Result};
use crate::feed::FeedFetcher;
use crate::models::Credential;
use crate::quota::QuotaState;
use crate::services::{GoogleRefresher, WebhookNotifier};
use crate::sync::{
    run_initial_setup, ChannelSyncer, FeedPrefilter, LaneConfig, LivestreamMonitor, Pipeline,
    PollingScheduler, SyncResult, TokenProvider, VideoIngestor,
};
use crate::youtube::{RetryExecutor, YouTubeClient};

pub struct App {
    pipeline: Pipeline,
    normal: LaneConfig,
    fast: LaneConfig,
    sync_interval: std::time::Duration,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let store: Arc<dyn Store> = Arc::new(repository);

        let quota = Arc::new(QuotaState::new());
        let cache = Arc::new(Cache::new());
        let source = Arc::new(YouTubeClient::new(RetryExecutor::new(quota.clone())));
        let notifier = Arc::new(WebhookNotifier::new(config.webhook_url.clone()));
        let refresher = Arc::new(GoogleRefresher::new(
            config.google_client_id.clone(),
            config.google_client_secret.clone(),
        ));

        let pipeline = Pipeline {
            store: store.clone(),
            quota,
            cache: cache.clone(),
            notifier: notifier.clone(),
            tokens: Arc::new(TokenProvider::new(store.clone(), refresher)),
            syncer: Arc::new(ChannelSyncer::new(store.clone(), source.clone())),
            ingestor: Arc::new(VideoIngestor::new(
                store.clone(),
                source.clone(),
                cache,
                notifier,
                config.recent_uploads,
            )),
            livestreams: Arc::new(LivestreamMonitor::new(store.clone(), source)),
            prefilter: Arc::new(FeedPrefilter::new(store, Arc::new(FeedFetcher::new()))),
        };

        Ok(Self {
            pipeline,
            normal: LaneConfig::normal(config.normal_cycle()),
            fast: LaneConfig::fast(config.fast_cycle()),
            sync_interval: config.sync_interval(),
        })
    }

    /// Bootstrap if this is a fresh store, then poll forever.
    pub async fn run(self) -> Result<()> {
        if let Err(e) = run_initial_setup(&self.pipeline).await {
            tracing::error!("Initial setup failed: {}", e);
        }

        let _sweep = start_sweep(self.pipeline.cache.clone());
        let scheduler = PollingScheduler::new(self.pipeline, self.normal, self.fast, self.sync_interval);
        scheduler.run().await;
        Ok(())
    }

    pub async fn sync_once(&self) -> Result<SyncResult> {
        let token = self
            .pipeline
            .tokens
            .get_valid_token()
            .await
            .ok_or_else(|| AppError::Config("no valid credential stored, use --set-credential".to_string()))?;
        self.pipeline.syncer.sync(&token).await
    }

    /// Store a credential that is due for refresh on first use.
    pub async fn set_credential(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        self.pipeline
            .store
            .save_credential(Credential {
                access_token: Some(access_token.to_string()),
                refresh_token: Some(refresh_token.to_string()),
                expires_at: Some(Utc::now()),
            })
            .await
    }

    pub async fn set_fast_lane(&self, channel_id: &str, fast_lane: bool) -> Result<()> {
        if !self.pipeline.store.set_fast_lane(channel_id, fast_lane).await? {
            return Err(AppError::Config(format!("unknown channel {}", channel_id)));
        }
        Ok(())
    }
}
