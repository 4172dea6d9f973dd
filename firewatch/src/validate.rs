use crate::errors::{Error, Result};
use crate::model::{DeviceConfig, IncomingReading, Reading, Registration};
use chrono::{DateTime, Utc};

/// Validates an ingestion body and stamps it with the arrival time
pub fn validate_reading(incoming: IncomingReading, now: DateTime<Utc>) -> Result<Reading> {
    let device_id = non_empty(incoming.device_id, "deviceId")?;

    let temperature = incoming
        .temperature
        .ok_or_else(|| Error::Validation("temperature is required".to_string()))?;
    if !temperature.is_finite() {
        return Err(Error::Validation(format!(
            "temperature {} is not a finite number",
            temperature
        )));
    }

    let smoke = incoming
        .smoke
        .ok_or_else(|| Error::Validation("smoke is required".to_string()))?;
    if !smoke.is_finite() {
        return Err(Error::Validation(format!(
            "smoke {} is not a finite number",
            smoke
        )));
    }

    Ok(Reading {
        device_id,
        temperature,
        smoke,
        timestamp: now,
    })
}

/// Validates a token registration; only the device id and token are mandatory
pub fn validate_registration(registration: Registration) -> Result<DeviceConfig> {
    let device_id = non_empty(registration.device_id.clone(), "deviceId")?;
    let token = non_empty(registration.token.clone(), "token")?;

    Ok(registration.into_config(device_id, token))
}

fn non_empty(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Validation(format!("{} is required", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incoming(device_id: &str, temperature: f64, smoke: f64) -> IncomingReading {
        IncomingReading {
            device_id: Some(device_id.to_string()),
            temperature: Some(temperature),
            smoke: Some(smoke),
        }
    }

    #[test]
    fn test_valid_reading() {
        let now = Utc::now();
        let reading = validate_reading(incoming("D1", 20.0, 15.0), now).unwrap();

        assert_eq!(reading.device_id, "D1");
        assert_eq!(reading.smoke, 15.0);
        assert_eq!(reading.timestamp, now);
    }

    #[test]
    fn test_missing_device_id() {
        let mut body = incoming("D1", 20.0, 15.0);
        body.device_id = None;
        assert!(validate_reading(body, Utc::now()).is_err());

        assert!(validate_reading(incoming("   ", 20.0, 15.0), Utc::now()).is_err());
    }

    #[test]
    fn test_missing_measurements() {
        let mut body = incoming("D1", 20.0, 15.0);
        body.smoke = None;
        assert!(validate_reading(body, Utc::now()).is_err());

        let mut body = incoming("D1", 20.0, 15.0);
        body.temperature = None;
        assert!(validate_reading(body, Utc::now()).is_err());
    }

    #[test]
    fn test_non_finite_measurement() {
        assert!(validate_reading(incoming("D1", f64::NAN, 1.0), Utc::now()).is_err());
        assert!(validate_reading(incoming("D1", 1.0, f64::INFINITY), Utc::now()).is_err());
    }

    #[test]
    fn test_registration_requires_token() {
        let registration = Registration {
            device_id: Some("D1".to_string()),
            ..Default::default()
        };
        match validate_registration(registration) {
            Err(Error::Validation(msg)) => assert!(msg.contains("token")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_registration_defaults() {
        let registration = Registration {
            device_id: Some("D1".to_string()),
            token: Some("T1".to_string()),
            smoke_threshold: Some(10.0),
            ..Default::default()
        };

        let config = validate_registration(registration).unwrap();
        assert_eq!(config.token.as_deref(), Some("T1"));
        assert_eq!(config.smoke_threshold, Some(10.0));
        assert_eq!(config.temp_threshold, None);
        assert!(config.notifications_enabled);
    }
}
