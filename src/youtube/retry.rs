use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::quota::QuotaState;

use super::ApiError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(1000);

/// Runs one upstream call with bounded retries.
///
/// Quota exhaustion is recorded on the shared [`QuotaState`] and returned at
/// once; every other failure is retried with linear backoff.
#[derive(Clone)]
pub struct RetryExecutor {
    quota: Arc<QuotaState>,
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryExecutor {
    pub fn new(quota: Arc<QuotaState>) -> Self {
        Self {
            quota,
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if self.quota.is_exceeded() {
            return Err(ApiError::QuotaExceeded);
        }

        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_quota() => {
                    self.quota.mark_exceeded();
                    return Err(ApiError::QuotaExceeded);
                }
                Err(e) if attempt < self.max_attempts => {
                    let delay = self.base_delay * attempt;
                    tracing::warn!(
                        "YouTube API call failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        self.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn executor() -> (RetryExecutor, Arc<QuotaState>) {
        let quota = Arc::new(QuotaState::new());
        let retry = RetryExecutor::new(quota.clone()).with_base_delay(Duration::from_millis(1));
        (retry, quota)
    }

    fn server_error() -> ApiError {
        ApiError::Status {
            status: 500,
            reason: None,
            message: "backend error".into(),
        }
    }

    #[tokio::test]
    async fn first_success_is_returned() {
        let (retry, _) = executor();
        let calls = &AtomicU32::new(0);
        let result = retry
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>(42)
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let (retry, _) = executor();
        let calls = &AtomicU32::new(0);
        let result = retry
            .execute(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(server_error())
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_three_attempts_with_original_error() {
        let (retry, quota) = executor();
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = retry
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;
        assert!(matches!(result, Err(ApiError::Status { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!quota.is_exceeded());
    }

    #[tokio::test]
    async fn quota_error_is_never_retried() {
        let (retry, quota) = executor();
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = retry
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Status {
                    status: 403,
                    reason: Some("quotaExceeded".into()),
                    message: "quota".into(),
                })
            })
            .await;
        assert!(matches!(result, Err(ApiError::QuotaExceeded)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(quota.is_exceeded());
    }

    #[tokio::test]
    async fn open_quota_window_skips_the_call() {
        let (retry, quota) = executor();
        quota.mark_exceeded();
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = retry
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(ApiError::QuotaExceeded)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
