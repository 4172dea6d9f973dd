use crate::metrics::{ALERTS_FAILED_TOTAL, ALERTS_SENT_TOTAL};
use crate::model::{DeviceConfig, Reading};
use crate::push::{PushError, PushMessage, PushSender};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ALERT_TITLE: &str = "🔥 Fire Alert";
const ALERT_SOUND: &str = "default";

/// Which threshold an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Smoke,
    Temperature,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Smoke => write!(f, "smoke"),
            AlertKind::Temperature => write!(f, "temperature"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertPolicy {
    /// Do not alert a device's own token about its own readings
    pub exclude_sender: bool,
}

/// An alert addressed to the token of one registered device
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub recipient: String,
    pub token: String,
    pub kind: AlertKind,
    pub value: f64,
    pub threshold: f64,
    pub source_device: String,
}

impl Alert {
    pub fn body(&self) -> String {
        match self.kind {
            AlertKind::Smoke => {
                format!("Smoke level at {}: {} ppm", self.source_device, self.value)
            }
            AlertKind::Temperature => {
                format!("Temperature at {}: {}°C", self.source_device, self.value)
            }
        }
    }

    pub fn to_push_message(&self) -> PushMessage {
        PushMessage {
            to: self.token.clone(),
            sound: ALERT_SOUND.to_string(),
            title: ALERT_TITLE.to_string(),
            body: self.body(),
            data: json!({
                "deviceId": self.source_device,
                "kind": self.kind.to_string(),
                "value": self.value,
                "threshold": self.threshold,
            }),
        }
    }
}

#[derive(Debug)]
pub struct DispatchOutcome {
    pub alert: Alert,
    pub result: Result<(), PushError>,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// `value > threshold`, where an absent threshold is never exceeded
fn exceeds(value: f64, threshold: Option<f64>) -> Option<f64> {
    threshold.filter(|t| value > *t)
}

/// Works out which alerts a reading triggers across the candidate configs.
pub fn evaluate(reading: &Reading, configs: &[DeviceConfig], policy: AlertPolicy) -> Vec<Alert> {
    let mut alerts = Vec::new();

    for config in configs {
        if !config.notifications_enabled {
            continue;
        }
        if policy.exclude_sender && config.device_id == reading.device_id {
            continue;
        }
        let Some(token) = &config.token else {
            debug!(device_id = %config.device_id, "No push token registered, skipping");
            continue;
        };

        let checks = [
            (AlertKind::Smoke, reading.smoke, config.smoke_threshold),
            (
                AlertKind::Temperature,
                reading.temperature,
                config.temp_threshold,
            ),
        ];

        for (kind, value, threshold) in checks {
            if let Some(threshold) = exceeds(value, threshold) {
                alerts.push(Alert {
                    recipient: config.device_id.clone(),
                    token: token.clone(),
                    kind,
                    value,
                    threshold,
                    source_device: reading.device_id.clone(),
                });
            }
        }
    }

    alerts
}

pub struct AlertDispatcher {
    push: Arc<dyn PushSender>,
    policy: AlertPolicy,
}

impl AlertDispatcher {
    pub fn new(push: Arc<dyn PushSender>, policy: AlertPolicy) -> Self {
        Self { push, policy }
    }

    /// Evaluates a reading and sends every resulting alert.
    pub async fn dispatch(&self, reading: &Reading, configs: &[DeviceConfig]) -> Vec<DispatchOutcome> {
        let alerts = evaluate(reading, configs, self.policy);
        let mut outcomes = Vec::with_capacity(alerts.len());

        for alert in alerts {
            let result = self.push.send(&alert.to_push_message()).await;
            match &result {
                Ok(()) => {
                    ALERTS_SENT_TOTAL.inc();
                    info!(
                        recipient = %alert.recipient,
                        source = %alert.source_device,
                        kind = %alert.kind,
                        "Alert sent"
                    );
                }
                Err(e) => {
                    ALERTS_FAILED_TOTAL.inc();
                    warn!(
                        recipient = %alert.recipient,
                        source = %alert.source_device,
                        kind = %alert.kind,
                        error = %e,
                        "Alert dispatch failed"
                    );
                }
            }
            outcomes.push(DispatchOutcome { alert, result });
        }

        outcomes
    }
}
