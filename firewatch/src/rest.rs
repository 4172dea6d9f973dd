use crate::errors::Error;
use crate::metrics::INVALID_READINGS_TOTAL;
use crate::model::{
    DeviceConfig, IncomingReading, MessageResponse, Reading, ReadingQuery, Registration,
};
use crate::pipeline::ingest;
use crate::state::AppState;
use crate::validate::{validate_reading, validate_registration};
use crate::ws::ws_handler;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/data", post(post_data).get(get_data))
        .route("/data/:device_id", get(get_device_data))
        .route("/register-token", post(register_token))
        .route("/settings/:device_id", get(get_settings))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn post_data(
    State(state): State<AppState>,
    body: Result<Json<IncomingReading>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let reading = body
        .map_err(ApiError::from_rejection)
        .and_then(|Json(incoming)| Ok(validate_reading(incoming, Utc::now())?))
        .inspect_err(|_| INVALID_READINGS_TOTAL.inc())?;

    ingest(&state, reading)
        .await
        .map_err(|e| ApiError::store(e, "Failed to store data"))?;

    Ok(Json(MessageResponse::new(
        "Data stored and sent to WebSocket clients",
    )))
}

async fn get_data(
    State(state): State<AppState>,
    Query(params): Query<ReadingQuery>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let device_id = params.device_id.as_deref().filter(|id| !id.is_empty());
    let readings = state
        .store
        .list_readings(device_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch data"))?;

    Ok(Json(readings))
}

async fn get_device_data(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<Vec<Reading>>, ApiError> {
    let readings = state
        .store
        .list_readings(Some(&device_id))
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch data"))?;

    Ok(Json(readings))
}

async fn register_token(
    State(state): State<AppState>,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(registration) = body.map_err(ApiError::from_rejection)?;
    let config = validate_registration(registration)?;

    state
        .store
        .upsert_device_config(&config)
        .await
        .map_err(|e| ApiError::store(e, "Failed to register token"))?;

    info!(
        device_id = %config.device_id,
        notifications_enabled = config.notifications_enabled,
        "Push token registered"
    );
    Ok(Json(MessageResponse::new("Token registered")))
}

async fn get_settings(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DeviceConfig>, ApiError> {
    state
        .store
        .device_config(&device_id)
        .await
        .map_err(|e| ApiError::store(e, "Failed to fetch settings"))?
        .map(Json)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Device not found"))
}

/// Error reply: a status code and a `{message}` body
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn from_rejection(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }

    /// Maps a store failure to a 500 with a fixed public message.
    fn store(err: Error, message: &str) -> Self {
        if err.is_store_failure() {
            error!("{}: {}", message, err);
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        } else {
            Self::from(err)
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(msg) => {
                debug!("Validation failed: {}", msg);
                Self::new(StatusCode::BAD_REQUEST, msg)
            }
            other => {
                error!("API error: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageResponse::new(self.message))).into_response()
    }
}
