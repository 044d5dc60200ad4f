use std::sync::Arc;

use crate::db::Store;
use crate::error::Result;
use crate::youtube::VideoSource;

/// Resolves end times for videos still recorded as live.
pub struct LivestreamMonitor {
    store: Arc<dyn Store>,
    source: Arc<dyn VideoSource>,
}

impl LivestreamMonitor {
    pub fn new(store: Arc<dyn Store>, source: Arc<dyn VideoSource>) -> Self {
        Self { store, source }
    }

    /// Returns how many livestreams were closed.
    pub async fn check_open_livestreams(&self, token: &str) -> Result<usize> {
        let open = self.store.open_livestream_ids().await?;
        if open.is_empty() {
            return Ok(0);
        }

        let details = self.source.list_video_details(&open, token).await?;
        let mut ended = 0;
        for detail in details {
            if let Some(ended_at) = detail.livestream_ended_at {
                self.store.set_livestream_ended(&detail.id, ended_at).await?;
                ended += 1;
            }
        }

        if ended > 0 {
            tracing::info!("{} livestream(s) ended", ended);
        }
        Ok(ended)
    }
}
