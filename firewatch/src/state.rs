use crate::alerts::AlertDispatcher;
use crate::store::TelemetryStore;
use crate::subscriptions::SubscriptionTable;
use std::sync::Arc;

/// Shared state handed to every HTTP handler and viewer connection.
///
/// Cheap to clone; everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
    pub subscriptions: Arc<SubscriptionTable>,
    pub dispatcher: Arc<AlertDispatcher>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        subscriptions: Arc<SubscriptionTable>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self {
            store,
            subscriptions,
            dispatcher,
        }
    }
}
