use std::collections::HashSet;
use std::sync::Arc;

use crate::db::Store;
use crate::error::Result;
use crate::models::NewChannel;
use crate::youtube::VideoSource;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub added: usize,
    pub removed: usize,
}

/// Reconciles local channels with the upstream subscription list.
pub struct ChannelSyncer {
    store: Arc<dyn Store>,
    source: Arc<dyn VideoSource>,
}

impl ChannelSyncer {
    pub fn new(store: Arc<dyn Store>, source: Arc<dyn VideoSource>) -> Self {
        Self { store, source }
    }

    pub async fn sync(&self, token: &str) -> Result<SyncResult> {
        let subscriptions = self.source.list_subscriptions(token).await?;
        let local: HashSet<String> = self.store.channel_ids().await?.into_iter().collect();

        let mut result = SyncResult::default();
        let mut upstream = HashSet::new();

        for subscription in subscriptions {
            if !upstream.insert(subscription.channel_id.clone()) || local.contains(&subscription.channel_id) {
                continue;
            }
            tracing::info!("Subscribed to new channel {} ({})", subscription.title, subscription.channel_id);
            self.store
                .insert_channel(NewChannel {
                    id: subscription.channel_id,
                    title: subscription.title,
                    thumbnail_url: subscription.thumbnail_url,
                })
                .await?;
            result.added += 1;
        }

        for id in local.difference(&upstream) {
            tracing::info!("Unsubscribed from channel {}, removing it", id);
            self.store.delete_channel(id).await?;
            result.removed += 1;
        }

        Ok(result)
    }
}
