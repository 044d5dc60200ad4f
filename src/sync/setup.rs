use super::Pipeline;
use crate::error::Result;

/// First-run bootstrap: import subscriptions and backfill every channel
/// without notifying. Returns `false` when there was nothing to do.
pub async fn run_initial_setup(pipeline: &Pipeline) -> Result<bool> {
    if pipeline.store.count_channels().await? > 0 {
        return Ok(false);
    }
    let Some(token) = pipeline.tokens.get_valid_token().await else {
        tracing::info!("No credential stored yet, skipping initial setup");
        return Ok(false);
    };

    tracing::info!("Running initial setup");
    let result = pipeline.syncer.sync(&token).await?;
    tracing::info!("Imported {} channels", result.added);

    for channel_id in pipeline.store.channel_ids().await? {
        match pipeline.ingestor.ingest(&channel_id, &token, false).await {
            Ok(_) => {}
            Err(e) if e.is_quota() => {
                tracing::warn!("Quota exhausted during initial setup, remaining channels left to the scheduler");
                break;
            }
            Err(e) => tracing::warn!("Initial fetch of {} failed: {}", channel_id, e),
        }
    }

    let channels = pipeline.store.count_channels().await?;
    let videos = pipeline.store.count_videos().await?;
    tracing::info!("Initial setup complete: {} channels, {} videos", channels, videos);
    if let Err(e) = pipeline.notifier.notify_setup_complete(channels, videos).await {
        tracing::warn!("Failed to send setup notification: {}", e);
    }
    Ok(true)
}
