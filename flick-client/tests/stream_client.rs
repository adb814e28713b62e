//! Stream client integration tests
//!
//! Run the client against a local SSE fixture server: event routing,
//! reconnection with subscriptions intact, and backoff exhaustion.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::Router;
use futures::stream::{Stream, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;

use flick_client::{BackoffPolicy, ConnectionState, StreamClient, StreamConfig};
use flick_common::events::{EventBus, EventKind, PipelineEvent, WireEvent};
use flick_common::model::Movie;

/// Minimal stream endpoint: forward every bus event as a wire message
async fn stream_endpoint(
    State(bus): State<EventBus>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        let event = result.ok()?;
        let json = serde_json::to_string(&event.to_wire()).ok()?;
        Some(Ok(Event::default().data(json)))
    });
    Sse::new(stream)
}

fn fixture_router(bus: EventBus) -> Router {
    Router::new()
        .route("/stream", get(stream_endpoint))
        .with_state(bus)
}

/// Start a fixture server on an ephemeral port
async fn start_fixture() -> (SocketAddr, EventBus, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let bus = EventBus::new(64);
    let handle = serve_fixture(listener, bus.clone());
    (addr, bus, handle)
}

/// Start a fixture server on a specific address (for restart tests)
async fn start_fixture_at(addr: SocketAddr) -> (EventBus, JoinHandle<()>) {
    let listener = TcpListener::bind(addr).await.expect("rebind");
    let bus = EventBus::new(64);
    let handle = serve_fixture(listener, bus.clone());
    (bus, handle)
}

fn serve_fixture(listener: TcpListener, bus: EventBus) -> JoinHandle<()> {
    tokio::spawn(async move {
        axum::serve(listener, fixture_router(bus))
            .await
            .expect("serve");
    })
}

fn search_event(query_id: &str) -> PipelineEvent {
    PipelineEvent::MovieSearchComplete {
        query_id: query_id.to_string(),
        movies: vec![Movie {
            imdb_id: "tt0372784".to_string(),
            title: "Batman Begins".to_string(),
            kind: "movie".to_string(),
            year: "2005".to_string(),
            poster: "p.jpg".to_string(),
        }],
        duration_ms: 5,
    }
}

fn fast_config(addr: SocketAddr) -> StreamConfig {
    StreamConfig::new(format!("http://{addr}")).with_backoff(BackoffPolicy {
        base_delay: Duration::from_millis(50),
        max_attempts: 5,
    })
}

/// Poll until the condition holds or the timeout elapses
async fn wait_until<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

async fn wait_connected(client: &StreamClient) {
    assert!(
        wait_until(
            || client.state() == ConnectionState::Connected,
            Duration::from_secs(3)
        )
        .await,
        "client never reached Connected, state: {:?}",
        client.state()
    );
}

#[tokio::test]
async fn routes_matching_events_and_filters_the_rest() {
    let (addr, bus, _server) = start_fixture().await;
    let client = StreamClient::new(fast_config(addr));

    let (tx, mut rx) = mpsc::unbounded_channel::<WireEvent>();
    client.subscribe(
        "sub-1",
        "q1",
        vec![EventKind::MovieSearchSuccess],
        move |event| {
            let _ = tx.send(event);
        },
    );
    wait_connected(&client).await;

    // Wrong correlation id, wrong kind, then the match
    bus.emit_lossy(search_event("q2"));
    bus.emit_lossy(PipelineEvent::AddFavoriteComplete {
        query_id: "q1".to_string(),
        favorites: vec![],
        duration_ms: 1,
    });
    bus.emit_lossy(search_event("q1"));

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event before timeout")
        .expect("channel open");
    assert_eq!(event.kind, EventKind::MovieSearchSuccess);
    assert_eq!(event.query_id, "q1");

    // Nothing else should have matched
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn empty_query_id_subscription_receives_every_id() {
    let (addr, bus, _server) = start_fixture().await;
    let client = StreamClient::new(fast_config(addr));

    let (tx, mut rx) = mpsc::unbounded_channel::<WireEvent>();
    client.subscribe(
        "relay",
        "",
        vec![EventKind::MovieSearchSuccess],
        move |event| {
            let _ = tx.send(event);
        },
    );
    wait_connected(&client).await;

    bus.emit_lossy(search_event("qa"));
    bus.emit_lossy(search_event("qb"));

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("first event")
        .expect("channel open");
    let second = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("second event")
        .expect("channel open");
    assert_eq!(first.query_id, "qa");
    assert_eq!(second.query_id, "qb");
}

#[tokio::test]
async fn update_query_id_rebinds_the_listener() {
    let (addr, bus, _server) = start_fixture().await;
    let client = StreamClient::new(fast_config(addr));

    let (tx, mut rx) = mpsc::unbounded_channel::<WireEvent>();
    client.subscribe(
        "sub-1",
        "old-query",
        vec![EventKind::MovieSearchSuccess],
        move |event| {
            let _ = tx.send(event);
        },
    );
    wait_connected(&client).await;

    client.update_query_id("sub-1", "new-query");

    bus.emit_lossy(search_event("old-query"));
    bus.emit_lossy(search_event("new-query"));

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event before timeout")
        .expect("channel open");
    assert_eq!(event.query_id, "new-query");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn reconnects_after_transport_drop_without_resubscribing() {
    let (addr, bus, server) = start_fixture().await;
    let client = StreamClient::new(fast_config(addr));

    let (tx, mut rx) = mpsc::unbounded_channel::<WireEvent>();
    client.subscribe(
        "sub-1",
        "q1",
        vec![EventKind::MovieSearchSuccess],
        move |event| {
            let _ = tx.send(event);
        },
    );
    wait_connected(&client).await;
    let attempts_before = client.connect_attempts();
    drop(bus);

    // Kill the server; the open stream terminates
    server.abort();
    assert!(
        wait_until(
            || client.state() != ConnectionState::Connected,
            Duration::from_secs(3)
        )
        .await,
        "client never noticed the drop"
    );

    // Bring the server back on the same address
    let (bus, _server) = start_fixture_at(addr).await;
    wait_connected(&client).await;
    assert!(client.connect_attempts() > attempts_before);

    // The original subscription still routes events
    bus.emit_lossy(search_event("q1"));
    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event after reconnect")
        .expect("channel open");
    assert_eq!(event.query_id, "q1");
}

#[tokio::test]
async fn stops_retrying_once_attempts_are_exhausted() {
    // Reserve an address nobody is listening on
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let config = StreamConfig::new(format!("http://{addr}")).with_backoff(BackoffPolicy {
        base_delay: Duration::from_millis(10),
        max_attempts: 2,
    });
    let client = StreamClient::new(config);

    client.subscribe(
        "sub-1",
        "q1",
        vec![EventKind::MovieSearchSuccess],
        |_| {},
    );

    // Initial attempt plus max_attempts retries, then terminal stop
    assert!(
        wait_until(|| client.connect_attempts() == 3, Duration::from_secs(3)).await,
        "expected 3 attempts, got {}",
        client.connect_attempts()
    );
    assert!(
        wait_until(
            || client.state() == ConnectionState::Disconnected,
            Duration::from_secs(1)
        )
        .await
    );

    // No further retries after giving up
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.connect_attempts(), 3);
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn tears_down_eagerly_when_last_subscription_is_removed() {
    let (addr, bus, _server) = start_fixture().await;
    let client = StreamClient::new(fast_config(addr));

    let (tx, mut rx) = mpsc::unbounded_channel::<WireEvent>();
    client.subscribe(
        "sub-1",
        "q1",
        vec![EventKind::MovieSearchSuccess],
        move |event| {
            let _ = tx.send(event);
        },
    );
    wait_connected(&client).await;
    assert_eq!(client.subscription_count(), 1);

    client.unsubscribe("sub-1");
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(client.subscription_count(), 0);

    // Events emitted after teardown never reach the old handler
    bus.emit_lossy(search_event("q1"));
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(rx.try_recv().is_err());
}
