use crate::errors::Result;
use crate::metrics::SWEEP_DELETED_TOTAL;
use crate::store::TelemetryStore;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// How long a reading is kept, in hours.
pub const RETENTION_HOURS: i64 = 24;

/// Deletes readings strictly older than `RETENTION_HOURS` before `now`.
///
/// A reading exactly at the boundary is kept.
pub async fn sweep(store: &dyn TelemetryStore, now: DateTime<Utc>) -> Result<u64> {
    let cutoff = now - Duration::hours(RETENTION_HOURS);
    let deleted = store.delete_readings_before(cutoff).await?;
    SWEEP_DELETED_TOTAL.inc_by(deleted as f64);
    Ok(deleted)
}

/// The first midnight (UTC) strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = now.date_naive() + Duration::days(1);
    next_day.and_time(NaiveTime::MIN).and_utc()
}

/// Next run time given the previous scheduled run, if any.
///
/// Never returns `previous` again even when the wall clock still reads just
/// before it after the timer fired. Runs missed while asleep are skipped.
pub fn next_run(now: DateTime<Utc>, previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    next_run_after(previous.map_or(now, |p| p.max(now)))
}

/// Runs the sweep every day at midnight until `cancel` fires.
pub async fn run(store: Arc<dyn TelemetryStore>, cancel: CancellationToken) {
    info!("Retention sweep scheduled daily at 00:00 UTC");

    let mut previous = None;
    loop {
        let now = Utc::now();
        let next = next_run(now, previous);
        let wait = (next - now).to_std().unwrap_or_default();
        debug!("Next retention sweep at {}", next);

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Retention sweep stopping");
                break;
            }
            _ = tokio::time::sleep(wait) => {
                info!("Running daily cleanup");
                match sweep(store.as_ref(), Utc::now().max(next)).await {
                    Ok(deleted) => info!(deleted, "Cleared old readings"),
                    Err(e) => error!(error = %e, "Retention sweep failed"),
                }
                previous = Some(next);
            }
        }
    }
}
