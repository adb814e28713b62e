//! Subscription registry
//!
//! Per-request filters over the shared event feed. A subscription
//! names the correlation id it cares about (empty = match any), the
//! event kinds it wants, and the handler to invoke. The registry is
//! the single dispatch point for every event the connection receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flick_common::events::{EventKind, WireEvent};
use tracing::debug;

/// Callback invoked with each matching event
///
/// Handlers run on the connection's read loop and must be fast and
/// non-blocking: update state, notify a channel, return.
pub type EventHandler = Arc<dyn Fn(WireEvent) + Send + Sync>;

struct Subscription {
    query_id: String,
    kinds: Vec<EventKind>,
    handler: EventHandler,
}

impl Subscription {
    fn matches(&self, event: &WireEvent) -> bool {
        let id_match = self.query_id.is_empty() || self.query_id == event.query_id;
        id_match && self.kinds.contains(&event.kind)
    }
}

/// Registry of active subscriptions, keyed by caller-chosen id
///
/// Safe under concurrent subscribe/unsubscribe from multiple logical
/// requests; re-registering an id replaces the prior entry.
#[derive(Default)]
pub struct SubscriptionRegistry {
    subscriptions: Mutex<HashMap<String, Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscription. Returns true when the registry was
    /// empty before this insert (i.e. this is the first subscriber).
    pub fn insert(
        &self,
        id: impl Into<String>,
        query_id: impl Into<String>,
        kinds: Vec<EventKind>,
        handler: EventHandler,
    ) -> bool {
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        let was_empty = subscriptions.is_empty();
        subscriptions.insert(
            id.into(),
            Subscription {
                query_id: query_id.into(),
                kinds,
                handler,
            },
        );
        was_empty
    }

    /// Remove a subscription. Returns true when the registry is empty
    /// afterwards (i.e. this was the last subscriber).
    pub fn remove(&self, id: &str) -> bool {
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        subscriptions.remove(id);
        subscriptions.is_empty()
    }

    /// Rebind an existing subscription to a new correlation id without
    /// touching the transport. No-op for unknown ids.
    pub fn update_query_id(&self, id: &str, query_id: impl Into<String>) {
        let mut subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(subscription) = subscriptions.get_mut(id) {
            subscription.query_id = query_id.into();
        }
    }

    /// Dispatch an event to every matching subscription.
    ///
    /// Multiple subscriptions may match the same event (a global
    /// activity log alongside a specific request's listener). Returns
    /// the number of handlers invoked.
    pub fn route(&self, event: &WireEvent) -> usize {
        // Collect matches under the lock, invoke after releasing it so
        // handlers may re-enter the registry
        let handlers: Vec<EventHandler> = {
            let subscriptions = self.subscriptions.lock().unwrap_or_else(|e| e.into_inner());
            subscriptions
                .values()
                .filter(|s| s.matches(event))
                .map(|s| Arc::clone(&s.handler))
                .collect()
        };

        if handlers.is_empty() {
            debug!(kind = event.kind.as_str(), query_id = %event.query_id, "event matched no subscription");
        }

        for handler in &handlers {
            handler(event.clone());
        }
        handlers.len()
    }

    pub fn len(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
