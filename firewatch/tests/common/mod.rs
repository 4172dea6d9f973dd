#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use firewatch::alerts::{AlertDispatcher, AlertPolicy};
use firewatch::memory::MemoryStore;
use firewatch::push::{PushError, PushMessage, PushSender};
use firewatch::subscriptions::SubscriptionTable;
use firewatch::{create_router, AppState};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Push sender that records every message and fails for chosen tokens
#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<PushMessage>>,
    pub failing_tokens: Mutex<HashSet<String>>,
}

impl RecordingPush {
    pub fn fail_for(&self, token: &str) {
        self.failing_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn sent(&self) -> Vec<PushMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, message: &PushMessage) -> Result<(), PushError> {
        if self.failing_tokens.lock().unwrap().contains(&message.to) {
            return Err(PushError::HttpStatus(500));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub push: Arc<RecordingPush>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(AlertPolicy::default())
    }

    pub fn with_policy(policy: AlertPolicy) -> Self {
        let push = Arc::new(RecordingPush::default());
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(SubscriptionTable::new()),
            Arc::new(AlertDispatcher::new(push.clone(), policy)),
        );
        Self { state, push }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.router().oneshot(request).await.unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response<Body> {
        self.post_raw(uri, body.to_string()).await
    }

    pub async fn post_raw(&self, uri: &str, body: String) -> Response<Body> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        self.router().oneshot(request).await.unwrap()
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
