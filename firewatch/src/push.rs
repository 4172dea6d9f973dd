use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default Expo endpoint for sending push notifications.
pub const EXPO_PUSH_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// HTTP request timeout for a single delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PushError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("push provider returned HTTP {0}")]
    HttpStatus(u16),

    #[error("push provider rejected message: {0}")]
    Rejected(String),
}

/// A notification addressed to one push token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushMessage {
    pub to: String,
    pub sound: String,
    pub title: String,
    pub body: String,
    pub data: Value,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError>;
}

#[derive(Debug, Deserialize)]
struct TicketResponse {
    data: Option<Ticket>,
}

#[derive(Debug, Deserialize)]
struct Ticket {
    status: String,
    message: Option<String>,
}

/// Sends notifications through the Expo push service
pub struct ExpoPushSender {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
}

impl ExpoPushSender {
    pub fn new(endpoint: String, access_token: String) -> Result<Self, PushError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            access_token,
        })
    }
}

#[async_trait]
impl PushSender for ExpoPushSender {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(message)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PushError::HttpStatus(response.status().as_u16()));
        }

        let ticket: TicketResponse = response.json().await?;
        check_ticket(ticket)
    }
}

fn check_ticket(response: TicketResponse) -> Result<(), PushError> {
    match response.data {
        Some(ticket) if ticket.status == "error" => Err(PushError::Rejected(
            ticket
                .message
                .unwrap_or_else(|| "no reason given".to_string()),
        )),
        _ => Ok(()),
    }
}
