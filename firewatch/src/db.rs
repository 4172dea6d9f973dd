use crate::errors::Result;
use crate::metrics::STORE_FAILURES_TOTAL;
use crate::model::{DeviceConfig, Reading};
use crate::store::TelemetryStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use std::time::Duration;
use tracing::{error, info};

pub async fn make_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Postgres-backed [`TelemetryStore`]
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DeviceConfigRow {
    device_id: String,
    push_token: Option<String>,
    smoke_threshold: Option<f64>,
    temp_threshold: Option<f64>,
    notifications_enabled: bool,
    provisioning: Json<Map<String, Value>>,
}

impl From<DeviceConfigRow> for DeviceConfig {
    fn from(row: DeviceConfigRow) -> Self {
        DeviceConfig {
            device_id: row.device_id,
            token: row.push_token,
            smoke_threshold: row.smoke_threshold,
            temp_threshold: row.temp_threshold,
            notifications_enabled: row.notifications_enabled,
            provisioning: row.provisioning.0,
        }
    }
}

const CONFIG_COLUMNS: &str = "device_id, push_token, smoke_threshold, temp_threshold, \
                              notifications_enabled, provisioning";

fn record_failure<T>(result: sqlx::Result<T>, operation: &str) -> Result<T> {
    result.map_err(|e| {
        STORE_FAILURES_TOTAL.inc();
        error!(operation, error = %e, "Database operation failed");
        e.into()
    })
}

#[async_trait]
impl TelemetryStore for PgStore {
    async fn insert_reading(&self, reading: &Reading) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO readings (device_id, temperature, smoke, ts) VALUES ($1, $2, $3, $4)",
        )
        .bind(&reading.device_id)
        .bind(reading.temperature)
        .bind(reading.smoke)
        .bind(reading.timestamp)
        .execute(&self.pool)
        .await;

        record_failure(result, "insert_reading")?;
        Ok(())
    }

    async fn list_readings(&self, device_id: Option<&str>) -> Result<Vec<Reading>> {
        let result = match device_id {
            Some(id) => {
                sqlx::query_as::<_, Reading>(
                    "SELECT device_id, temperature, smoke, ts as timestamp
                     FROM readings
                     WHERE device_id = $1
                     ORDER BY ts ASC, id ASC",
                )
                .bind(id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Reading>(
                    "SELECT device_id, temperature, smoke, ts as timestamp
                     FROM readings
                     ORDER BY ts ASC, id ASC",
                )
                .fetch_all(&self.pool)
                .await
            }
        };

        record_failure(result, "list_readings")
    }

    async fn delete_readings_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM readings WHERE ts < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await;

        Ok(record_failure(result, "delete_readings_before")?.rows_affected())
    }

    async fn upsert_device_config(&self, config: &DeviceConfig) -> Result<()> {
        let mut tx = record_failure(self.pool.begin().await, "upsert_device_config")?;

        if let Some(token) = &config.token {
            // Registrations of one token serialize here until commit
            let result = sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(token)
                .execute(&mut *tx)
                .await;
            record_failure(result, "upsert_device_config")?;

            let result = sqlx::query(
                "UPDATE device_configs SET push_token = NULL, updated_at = now()
                 WHERE push_token = $1 AND device_id <> $2",
            )
            .bind(token)
            .bind(&config.device_id)
            .execute(&mut *tx)
            .await;
            record_failure(result, "upsert_device_config")?;
        }

        let result = sqlx::query(
            "INSERT INTO device_configs
                 (device_id, push_token, smoke_threshold, temp_threshold,
                  notifications_enabled, provisioning, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, now())
             ON CONFLICT (device_id) DO UPDATE SET
                 push_token = EXCLUDED.push_token,
                 smoke_threshold = EXCLUDED.smoke_threshold,
                 temp_threshold = EXCLUDED.temp_threshold,
                 notifications_enabled = EXCLUDED.notifications_enabled,
                 provisioning = EXCLUDED.provisioning,
                 updated_at = now()",
        )
        .bind(&config.device_id)
        .bind(&config.token)
        .bind(config.smoke_threshold)
        .bind(config.temp_threshold)
        .bind(config.notifications_enabled)
        .bind(Json(&config.provisioning))
        .execute(&mut *tx)
        .await;
        record_failure(result, "upsert_device_config")?;

        record_failure(tx.commit().await, "upsert_device_config")
    }

    async fn device_config(&self, device_id: &str) -> Result<Option<DeviceConfig>> {
        let query = format!(
            "SELECT {} FROM device_configs WHERE device_id = $1",
            CONFIG_COLUMNS
        );
        let result = sqlx::query_as::<_, DeviceConfigRow>(&query)
            .bind(device_id)
            .fetch_optional(&self.pool)
            .await;

        Ok(record_failure(result, "device_config")?.map(DeviceConfig::from))
    }

    async fn alert_candidates(&self) -> Result<Vec<DeviceConfig>> {
        let query = format!(
            "SELECT {} FROM device_configs WHERE notifications_enabled ORDER BY device_id",
            CONFIG_COLUMNS
        );
        let result = sqlx::query_as::<_, DeviceConfigRow>(&query)
            .fetch_all(&self.pool)
            .await;

        Ok(record_failure(result, "alert_candidates")?
            .into_iter()
            .map(DeviceConfig::from)
            .collect())
    }
}
