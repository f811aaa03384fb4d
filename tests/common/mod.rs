//! Shared utilities for integration tests.
//!
//! Provides a harness bundling a transport with its in-memory store and
//! counting registry, plus request and hook builders. These helpers reduce
//! duplication across test modules.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use longpoll::{
    config::LongPollingConfig,
    hooks::CompletionSignal,
    request::{ConnectionId, PollRequest},
    test_support::{CountingRegistry, InMemoryStore},
    transport::LongPollingTransport,
};

/// Transport wired to an in-memory store and a counting registry, with
/// both collaborators kept reachable for assertions.
pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub registry: Arc<CountingRegistry>,
    pub transport: LongPollingTransport<InMemoryStore, CountingRegistry>,
}

/// Build a harness around `config`.
pub fn harness(config: LongPollingConfig) -> Harness {
    // First caller wins; later attempts fail harmlessly.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = Arc::new(InMemoryStore::new());
    let registry = Arc::new(CountingRegistry::new());
    let transport = LongPollingTransport::new(Arc::clone(&store), Arc::clone(&registry), config);
    Harness {
        store,
        registry,
        transport,
    }
}

/// Configuration with a short poll timeout so held polls expire quickly
/// under the paused test clock.
pub fn quick_config() -> LongPollingConfig {
    LongPollingConfig::new().with_poll_timeout(Duration::from_millis(200))
}

pub fn connect_request(connection: &str) -> PollRequest {
    PollRequest::new(ConnectionId::from(connection), "/messaging/connect")
}

pub fn reconnect_request(connection: &str, since: &str) -> PollRequest {
    PollRequest::new(ConnectionId::from(connection), "/messaging/reconnect")
        .with_query_string(&format!("messageId={since}"))
}

pub fn poll_request(connection: &str, since: &str) -> PollRequest {
    PollRequest::new(ConnectionId::from(connection), "/messaging/poll")
        .with_query_string(&format!("messageId={since}"))
}

pub fn send_request(connection: &str, data: &str) -> PollRequest {
    PollRequest::new(ConnectionId::from(connection), "/messaging/send")
        .with_form_body(&format!("data={data}"))
}

/// A session hook that counts invocations and completes immediately.
pub fn counting_hook(
    counter: &Arc<AtomicUsize>,
) -> impl FnMut() -> CompletionSignal + Send + 'static {
    let counter = Arc::clone(counter);
    move || {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

/// A session hook that always fails.
pub fn failing_hook() -> impl FnMut() -> CompletionSignal + Send + 'static {
    || Box::pin(async { Err("callback failed".into()) })
}
