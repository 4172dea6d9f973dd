use serde::Serialize;

/// Body of `POST /data`, as a sensor board sends it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub device_id: String,
    pub temperature: f64,
    pub smoke: f64,
}
