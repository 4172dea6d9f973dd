use crate::errors::{Error, Result};
use crate::model::{DeviceConfig, Reading};
use crate::store::TelemetryStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// In-process store used by tests and by `STORE=memory` local runs.
///
/// Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    readings: Mutex<Vec<Reading>>,
    configs: Mutex<BTreeMap<String, DeviceConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Store("lock poisoned".to_string()))
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn insert_reading(&self, reading: &Reading) -> Result<()> {
        lock(&self.readings)?.push(reading.clone());
        Ok(())
    }

    async fn list_readings(&self, device_id: Option<&str>) -> Result<Vec<Reading>> {
        let mut readings: Vec<Reading> = lock(&self.readings)?
            .iter()
            .filter(|r| device_id.map_or(true, |id| r.device_id == id))
            .cloned()
            .collect();
        readings.sort_by_key(|r| r.timestamp);
        Ok(readings)
    }

    async fn delete_readings_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut readings = lock(&self.readings)?;
        let before = readings.len();
        readings.retain(|r| r.timestamp >= cutoff);
        Ok((before - readings.len()) as u64)
    }

    async fn upsert_device_config(&self, config: &DeviceConfig) -> Result<()> {
        let mut configs = lock(&self.configs)?;
        if let Some(token) = &config.token {
            for other in configs.values_mut() {
                if other.device_id != config.device_id && other.token.as_ref() == Some(token) {
                    other.token = None;
                }
            }
        }
        configs.insert(config.device_id.clone(), config.clone());
        Ok(())
    }

    async fn device_config(&self, device_id: &str) -> Result<Option<DeviceConfig>> {
        Ok(lock(&self.configs)?.get(device_id).cloned())
    }

    async fn alert_candidates(&self) -> Result<Vec<DeviceConfig>> {
        Ok(lock(&self.configs)?
            .values()
            .filter(|c| c.notifications_enabled)
            .cloned()
            .collect())
    }
}
