use crate::model::Reading;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error};
use uuid::Uuid;

/// Identifier the server assigns to each viewer connection
pub type ConnectionId = Uuid;

/// Outbound queue of a viewer connection; items are JSON text frames.
pub type ViewerSender = mpsc::UnboundedSender<String>;

/// Result of pushing one reading to the viewers of a device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub skipped: usize,
}

#[derive(Default)]
struct Inner {
    connections: HashMap<ConnectionId, ViewerSender>,
    // Per-device subscribers in subscription order
    devices: HashMap<String, Vec<ConnectionId>>,
}

/// Live mapping of device id to the viewer connections watching it.
///
/// Shared behind an `Arc`. Every mutation runs under one write guard with
/// no await inside, so other tasks never see a half-applied change.
#[derive(Default)]
pub struct SubscriptionTable {
    inner: RwLock<Inner>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new connection and returns the receiving half of its
    /// outbound queue.
    pub async fn register(&self, conn_id: ConnectionId) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().await.connections.insert(conn_id, tx);
        rx
    }

    /// Subscribes a connection to a device. Repeated calls are no-ops.
    ///
    /// Returns `false` when the connection is unknown (never registered or
    /// already gone).
    pub async fn subscribe(&self, conn_id: ConnectionId, device_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        if !inner.connections.contains_key(&conn_id) {
            return false;
        }

        let subscribers = inner.devices.entry(device_id.to_string()).or_default();
        if !subscribers.contains(&conn_id) {
            subscribers.push(conn_id);
        }
        true
    }

    /// Drops a connection from every device it watched and forgets it.
    pub async fn unsubscribe_all(&self, conn_id: ConnectionId) {
        let mut inner = self.inner.write().await;
        inner.connections.remove(&conn_id);
        inner.devices.retain(|_, subscribers| {
            subscribers.retain(|id| *id != conn_id);
            !subscribers.is_empty()
        });
    }

    /// Sends a reading to every open connection subscribed to `device_id`.
    ///
    /// Closed connections are skipped and left in place; they leave the
    /// table through [`SubscriptionTable::unsubscribe_all`].
    pub async fn fanout(&self, device_id: &str, reading: &Reading) -> FanoutReport {
        let inner = self.inner.read().await;
        let Some(subscribers) = inner.devices.get(device_id) else {
            return FanoutReport::default();
        };

        let payload = match serde_json::to_string(reading) {
            Ok(p) => p,
            Err(e) => {
                error!(device_id, error = %e, "Failed to serialize reading");
                return FanoutReport {
                    delivered: 0,
                    skipped: subscribers.len(),
                };
            }
        };

        let mut report = FanoutReport::default();
        for conn_id in subscribers {
            let sent = inner
                .connections
                .get(conn_id)
                .is_some_and(|tx| tx.send(payload.clone()).is_ok());
            if sent {
                report.delivered += 1;
            } else {
                debug!(device_id, conn_id = %conn_id, "Skipping closed viewer connection");
                report.skipped += 1;
            }
        }
        report
    }

    /// Connections watching `device_id`, in the order [`fanout`] reaches them.
    ///
    /// [`fanout`]: SubscriptionTable::fanout
    pub async fn subscribers(&self, device_id: &str) -> Vec<ConnectionId> {
        self.inner
            .read()
            .await
            .devices
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn subscriber_count(&self, device_id: &str) -> usize {
        self.inner
            .read()
            .await
            .devices
            .get(device_id)
            .map_or(0, Vec::len)
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }
}
