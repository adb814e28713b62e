//! Stream connection manager
//!
//! Owns the single SSE connection shared by every logical request in
//! the process. The connection is created when the first subscription
//! registers, torn down eagerly when the last one is removed, and
//! re-established with exponential backoff when the transport drops.
//! Registered subscriptions survive reconnects without
//! re-registration.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flick_common::events::{EventKind, WireEvent};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backoff::BackoffPolicy;
use crate::error::{Error, Result};
use crate::sse::SseDecoder;
use crate::subscription::{EventHandler, SubscriptionRegistry};

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport; nothing is listening (also the terminal state
    /// after backoff exhaustion)
    Disconnected,
    /// Transport is being established
    Connecting,
    /// Transport open, events flowing
    Connected,
    /// Transport dropped; waiting out the backoff delay
    Reconnecting,
}

/// Configuration for [`StreamClient`]
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Server base URL; the stream lives at `{base_url}/stream`
    pub base_url: String,
    pub backoff: BackoffPolicy,
}

impl StreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Override just the backoff base delay
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.backoff.base_delay = base_delay;
        self
    }

    /// Override just the backoff attempt cap
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.backoff.max_attempts = max_attempts;
        self
    }
}

/// Shared-stream client handle
///
/// Construct one per process and pass it (cheaply cloned) to every
/// component that needs stream access; ownership of the connection is
/// explicit rather than hidden in a global.
#[derive(Clone)]
pub struct StreamClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: StreamConfig,
    http: reqwest::Client,
    registry: SubscriptionRegistry,
    state: Mutex<ConnectionState>,
    reader: Mutex<Option<JoinHandle<()>>>,
    /// Total connection attempts made, for observability and tests
    connect_attempts: AtomicU32,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                http: reqwest::Client::new(),
                registry: SubscriptionRegistry::new(),
                state: Mutex::new(ConnectionState::Disconnected),
                reader: Mutex::new(None),
                connect_attempts: AtomicU32::new(0),
            }),
        }
    }

    /// Register a subscription for events matching `query_id` (empty =
    /// match any) and `kinds`. The first registration opens the
    /// connection.
    ///
    /// Re-registering the same `id` replaces the prior entry.
    pub fn subscribe<F>(
        &self,
        id: impl Into<String>,
        query_id: impl Into<String>,
        kinds: Vec<EventKind>,
        handler: F,
    ) where
        F: Fn(WireEvent) + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        let was_empty = self.inner.registry.insert(id, query_id, kinds, handler);

        if was_empty {
            self.start_reader();
        }
    }

    /// Remove a subscription. Removing the last one tears the
    /// connection down immediately.
    pub fn unsubscribe(&self, id: &str) {
        let now_empty = self.inner.registry.remove(id);
        if now_empty {
            self.stop_reader();
        }
    }

    /// Rebind a subscription to a new correlation id without touching
    /// the transport. Used when a component issues a second request
    /// through the same listener.
    pub fn update_query_id(&self, id: &str, query_id: impl Into<String>) {
        self.inner.registry.update_query_id(id, query_id);
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Total connection attempts made so far
    pub fn connect_attempts(&self) -> u32 {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of registered subscriptions
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.len()
    }

    fn start_reader(&self) {
        let mut reader = self.inner.reader.lock().unwrap_or_else(|e| e.into_inner());
        let running = reader.as_ref().is_some_and(|handle| !handle.is_finished());
        if running {
            return;
        }

        let inner = Arc::clone(&self.inner);
        *reader = Some(tokio::spawn(run_connection(inner)));
    }

    fn stop_reader(&self) {
        let mut reader = self.inner.reader.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = reader.take() {
            handle.abort();
        }
        self.inner.set_state(ConnectionState::Disconnected);
        debug!("no subscribers left, stream disconnected");
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Connection loop: connect, pump events, reconnect with backoff.
///
/// Runs until the subscriber set empties, the task is aborted by
/// [`StreamClient::unsubscribe`], or the backoff budget is exhausted.
/// Exhaustion is terminal: the state parks at `Disconnected` and no
/// further events are surfaced, so callers wanting liveness guarantees
/// must layer their own timeout.
async fn run_connection(inner: Arc<Inner>) {
    let mut failures: u32 = 0;

    loop {
        if inner.registry.is_empty() {
            inner.set_state(ConnectionState::Disconnected);
            return;
        }

        inner.set_state(ConnectionState::Connecting);
        inner.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = pump_events(&inner, &mut failures).await {
            warn!(error = %e, "stream transport dropped");
        }

        failures += 1;
        match inner.config.backoff.delay_for(failures) {
            Some(delay) => {
                info!(attempt = failures, delay_ms = delay.as_millis() as u64, "reconnecting");
                inner.set_state(ConnectionState::Reconnecting);
                tokio::time::sleep(delay).await;
            }
            None => {
                warn!(attempts = failures, "reconnect attempts exhausted, giving up");
                inner.set_state(ConnectionState::Disconnected);
                return;
            }
        }
    }
}

/// Open the stream and dispatch events until the transport fails.
///
/// Resets the failure counter once the server accepts the connection,
/// so the backoff schedule starts over after every successful open.
async fn pump_events(inner: &Inner, failures: &mut u32) -> Result<()> {
    let url = format!("{}/stream", inner.config.base_url);
    debug!(url = %url, "connecting to stream");

    let response = inner
        .http
        .get(&url)
        .header("accept", "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    info!("stream connected");
    inner.set_state(ConnectionState::Connected);
    *failures = 0;

    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        for payload in decoder.push(&chunk) {
            match serde_json::from_str::<WireEvent>(&payload) {
                Ok(event) => {
                    inner.registry.route(&event);
                }
                Err(e) => debug!(error = %e, "skipping undecodable stream message"),
            }
        }
    }

    // Server closed the stream; treat like any transport drop
    Err(Error::Closed)
}
