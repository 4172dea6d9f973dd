use crate::alerts::DispatchOutcome;
use crate::errors::Result;
use crate::metrics::{
    BROADCAST_DELIVERED_TOTAL, BROADCAST_SKIPPED_TOTAL, INGEST_LATENCY_SECONDS, READINGS_TOTAL,
};
use crate::model::Reading;
use crate::state::AppState;
use crate::subscriptions::FanoutReport;
use tokio::time::Instant;
use tracing::{debug, error};

/// What happened to one ingested reading after it was stored
#[derive(Debug)]
pub struct IngestReport {
    pub reading: Reading,
    pub fanout: FanoutReport,
    pub alerts: Vec<DispatchOutcome>,
}

/// Stores a validated reading, then broadcasts it, then runs alerting.
///
/// Only the store write can fail the call. Broadcast and alert failures are
/// logged and reflected in the report.
pub async fn ingest(state: &AppState, reading: Reading) -> Result<IngestReport> {
    let start = Instant::now();

    state.store.insert_reading(&reading).await?;
    READINGS_TOTAL.inc();

    let fanout = state
        .subscriptions
        .fanout(&reading.device_id, &reading)
        .await;
    BROADCAST_DELIVERED_TOTAL.inc_by(fanout.delivered as f64);
    BROADCAST_SKIPPED_TOTAL.inc_by(fanout.skipped as f64);

    let alerts = match state.store.alert_candidates().await {
        Ok(configs) => state.dispatcher.dispatch(&reading, &configs).await,
        Err(e) => {
            error!(device_id = %reading.device_id, error = %e, "Failed to load alert candidates");
            Vec::new()
        }
    };

    let elapsed = start.elapsed().as_secs_f64();
    INGEST_LATENCY_SECONDS.observe(elapsed);
    debug!(
        device_id = %reading.device_id,
        delivered = fanout.delivered,
        skipped = fanout.skipped,
        alerts = alerts.len(),
        "Reading ingested in {:.3}s",
        elapsed
    );

    Ok(IngestReport {
        reading,
        fanout,
        alerts,
    })
}
