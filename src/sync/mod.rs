mod channels;
mod ingest;
mod livestream;
mod prefilter;
mod scheduler;
mod setup;
mod token;

use std::sync::Arc;

use crate::cache::Cache;
use crate::db::Store;
use crate::quota::QuotaState;
use crate::services::Notifier;

pub use channels::{ChannelSyncer, SyncResult};
pub use ingest::{VideoIngestor, SHORTS_CACHE_PREFIX};
pub use livestream::LivestreamMonitor;
pub use prefilter::FeedPrefilter;
pub use scheduler::{LaneConfig, PollingScheduler};
pub use setup::run_initial_setup;
pub use token::TokenProvider;

/// The collaborators every ingestion path shares, built once at startup.
#[derive(Clone)]
pub struct Pipeline {
    pub store: Arc<dyn Store>,
    pub quota: Arc<QuotaState>,
    pub cache: Arc<Cache<Vec<String>>>,
    pub notifier: Arc<dyn Notifier>,
    pub tokens: Arc<TokenProvider>,
    pub syncer: Arc<ChannelSyncer>,
    pub ingestor: Arc<VideoIngestor>,
    pub livestreams: Arc<LivestreamMonitor>,
    pub prefilter: Arc<FeedPrefilter>,
}
