use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One telemetry sample from a smoke/temperature sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub device_id: String,
    pub temperature: f64,
    pub smoke: f64,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /data` before validation. Every field is optional so that
/// missing fields surface as validation errors rather than extractor rejections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingReading {
    pub device_id: Option<String>,
    pub temperature: Option<f64>,
    pub smoke: Option<f64>,
}

/// Alert configuration registered for a device.
///
/// `token` is `None` once the push token has been re-registered under
/// another device. Thresholds that were absent or malformed at registration
/// are stored as `None` and are never exceeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub device_id: String,
    pub token: Option<String>,
    pub smoke_threshold: Option<f64>,
    pub temp_threshold: Option<f64>,
    pub notifications_enabled: bool,
    #[serde(flatten)]
    pub provisioning: Map<String, Value>,
}

/// Body of `POST /register-token`.
///
/// Unknown members are kept in `provisioning` and stored verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub smoke_threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub temp_threshold: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub notifications_enabled: Option<bool>,
    #[serde(flatten)]
    pub provisioning: Map<String, Value>,
}

impl Registration {
    /// Turns a validated registration into the configuration that gets stored.
    pub fn into_config(self, device_id: String, token: String) -> DeviceConfig {
        DeviceConfig {
            device_id,
            token: Some(token),
            smoke_threshold: self.smoke_threshold,
            temp_threshold: self.temp_threshold,
            notifications_enabled: self.notifications_enabled.unwrap_or(true),
            provisioning: self.provisioning,
        }
    }
}

/// Reply body used by the write endpoints and by error responses
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Query string of `GET /data`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingQuery {
    pub device_id: Option<String>,
}

/// Accepts a number or a numeric string; anything else becomes `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|v| v.is_finite()))
}

/// `true`/`false` as booleans or strings. Any other value that is present
/// reads as `false` so a garbled opt-out never turns alerts on.
fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Some(match value {
        Value::Bool(b) => b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }))
}
