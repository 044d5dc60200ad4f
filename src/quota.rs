use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Days, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;

#[derive(Debug, Default)]
struct QuotaInner {
    exceeded: bool,
    reset_at: Option<DateTime<Utc>>,
}

/// Tracks whether the daily upstream quota has been spent.
///
/// One instance is shared by every lane. The exhausted flag clears itself on
/// the first read after the recorded reset time.
#[derive(Debug, Default)]
pub struct QuotaState {
    inner: Mutex<QuotaInner>,
}

impl QuotaState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, QuotaInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_exceeded(&self) -> bool {
        self.is_exceeded_at(Utc::now())
    }

    fn is_exceeded_at(&self, now: DateTime<Utc>) -> bool {
        let mut inner = self.lock();
        if !inner.exceeded {
            return false;
        }
        match inner.reset_at {
            Some(reset_at) if now >= reset_at => {
                inner.exceeded = false;
                inner.reset_at = None;
                tracing::info!("Quota window passed, resuming API calls");
                false
            }
            _ => true,
        }
    }

    pub fn mark_exceeded(&self) {
        self.mark_exceeded_at(Utc::now());
    }

    fn mark_exceeded_at(&self, now: DateTime<Utc>) {
        let reset_at = next_reset_after(now);
        let mut inner = self.lock();
        inner.exceeded = true;
        inner.reset_at = Some(reset_at);
        tracing::warn!(%reset_at, "Quota exceeded, API calls paused until reset");
    }

    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.exceeded = false;
        inner.reset_at = None;
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        self.lock().reset_at
    }
}

/// The upstream quota rolls over at midnight Pacific time, whatever the
/// server's own locale.
fn next_reset_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let local = now.with_timezone(&Los_Angeles);
    local
        .date_naive()
        .checked_add_days(Days::new(1))
        .map(|day| day.and_time(NaiveTime::MIN))
        .and_then(|midnight| Los_Angeles.from_local_datetime(&midnight).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .unwrap_or_else(|| now + Duration::hours(24))
}
