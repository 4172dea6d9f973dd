use crate::errors::Result;
use crate::model::{DeviceConfig, Reading};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable side of the service: the reading log and the device registry.
///
/// Implemented by [`crate::db::PgStore`] in production and by
/// [`crate::memory::MemoryStore`] for tests and local runs.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Appends one reading to the log.
    async fn insert_reading(&self, reading: &Reading) -> Result<()>;

    /// Lists readings in ascending timestamp order, optionally for one device.
    async fn list_readings(&self, device_id: Option<&str>) -> Result<Vec<Reading>>;

    /// Deletes every reading strictly older than `cutoff` and returns the
    /// number of rows removed. Deleting already-deleted rows is a no-op.
    async fn delete_readings_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Inserts or replaces the configuration keyed by its device id.
    ///
    /// Any other device currently holding the same push token loses it.
    async fn upsert_device_config(&self, config: &DeviceConfig) -> Result<()>;

    async fn device_config(&self, device_id: &str) -> Result<Option<DeviceConfig>>;

    /// Configurations that may receive alerts (notifications enabled).
    async fn alert_candidates(&self) -> Result<Vec<DeviceConfig>>;
}
