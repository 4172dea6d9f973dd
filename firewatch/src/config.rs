use crate::alerts::AlertPolicy;
use crate::errors::{Error, Result};
use crate::push::EXPO_PUSH_ENDPOINT;
use std::collections::HashMap;
use std::env;

/// Where readings and device configurations live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Postgres { database_url: String },
    Memory,
}

/// Process configuration.
///
/// | Variable               | Default                                 |
/// |------------------------|-----------------------------------------|
/// | `STORE`                | `postgres` (`memory` for local runs)    |
/// | `DATABASE_URL`         | required when `STORE=postgres`          |
/// | `DB_MAX_CONNECTIONS`   | `20`                                    |
/// | `EXPO_ACCESS_TOKEN`    | required                                |
/// | `PUSH_ENDPOINT`        | `https://exp.host/--/api/v2/push/send`  |
/// | `HTTP_ADDR`            | `0.0.0.0:3000`                          |
/// | `ALERT_EXCLUDE_SENDER` | `false`                                 |
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub db_max_connections: u32,
    pub push_access_token: String,
    pub push_endpoint: String,
    pub http_addr: String,
    pub alert_policy: AlertPolicy,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; real deployments set the variables directly.
        let _ = dotenvy::dotenv();
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let store = match get("STORE").unwrap_or("postgres") {
            "memory" => StoreKind::Memory,
            "postgres" => StoreKind::Postgres {
                database_url: get("DATABASE_URL")
                    .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?
                    .to_string(),
            },
            other => {
                return Err(Error::Config(format!(
                    "STORE must be 'postgres' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let push_access_token = get("EXPO_ACCESS_TOKEN")
            .ok_or_else(|| Error::Config("EXPO_ACCESS_TOKEN is not set".to_string()))?
            .to_string();

        let db_max_connections: u32 = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().map_err(|_| {
                Error::Config(format!("DB_MAX_CONNECTIONS must be a number, got '{}'", v))
            })?,
            None => 20,
        };

        let exclude_sender: bool = match get("ALERT_EXCLUDE_SENDER") {
            Some(v) => v.parse().map_err(|_| {
                Error::Config(format!(
                    "ALERT_EXCLUDE_SENDER must be 'true' or 'false', got '{}'",
                    v
                ))
            })?,
            None => false,
        };

        Ok(Self {
            store,
            db_max_connections,
            push_access_token,
            push_endpoint: get("PUSH_ENDPOINT")
                .unwrap_or(EXPO_PUSH_ENDPOINT)
                .to_string(),
            http_addr: get("HTTP_ADDR").unwrap_or("0.0.0.0:3000").to_string(),
            alert_policy: AlertPolicy { exclude_sender },
        })
    }
}
