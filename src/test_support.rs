//! Shared helpers for exercising the transport in tests.
//!
//! Provides an in-memory [`MessageStore`] with bounded buffering and abort
//! support, a recording [`ResponseWriter`], and counting/failing registry
//! doubles. These are not part of the transport itself; production hosts
//! supply their own store, registry, and response plumbing.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::{
    batch::MessageBatch,
    error::BoxError,
    heartbeat::{HeartbeatRegistry, LivenessRegistry},
    host::ResponseWriter,
    request::ConnectionId,
    store::MessageStore,
};

#[derive(Default)]
struct ConnectionQueue {
    messages: Vec<(u64, Value)>,
    next_id: u64,
    aborted: bool,
}

impl ConnectionQueue {
    fn last_id(&self) -> u64 { self.next_id }
}

/// In-memory message store keyed by connection identity.
///
/// Messages carry monotonically increasing numeric ids per connection.
/// A pending receive wakes when a message is published for its
/// connection, when the buffered bound is reached, or when the
/// connection is aborted.
#[derive(Default)]
pub struct InMemoryStore {
    connections: Mutex<HashMap<ConnectionId, ConnectionQueue>>,
    wakers: Mutex<HashMap<ConnectionId, Arc<Notify>>>,
    receive_calls: AtomicUsize,
    abort_calls: AtomicUsize,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Publish a message for `connection`, returning its assigned id.
    pub fn publish(&self, connection: &ConnectionId, message: Value) -> String {
        let id = {
            let mut connections = self.connections.lock().expect("store lock");
            let queue = connections.entry(connection.clone()).or_default();
            queue.next_id += 1;
            queue.messages.push((queue.next_id, message));
            queue.next_id
        };
        self.waker(connection).notify_one();
        id.to_string()
    }

    /// Number of `receive` calls issued against this store.
    #[must_use]
    pub fn receive_calls(&self) -> usize { self.receive_calls.load(Ordering::SeqCst) }

    /// Number of `abort` calls issued against this store.
    #[must_use]
    pub fn abort_calls(&self) -> usize { self.abort_calls.load(Ordering::SeqCst) }

    fn waker(&self, connection: &ConnectionId) -> Arc<Notify> {
        let mut wakers = self.wakers.lock().expect("waker lock");
        Arc::clone(wakers.entry(connection.clone()).or_default())
    }

    /// Collect up to `max_buffered` messages newer than `since_id`, or an
    /// aborted marker batch, if either is ready now.
    fn try_collect(
        &self,
        connection: &ConnectionId,
        since_id: u64,
        max_buffered: usize,
    ) -> Option<MessageBatch> {
        let mut connections = self.connections.lock().expect("store lock");
        let queue = connections.entry(connection.clone()).or_default();
        if queue.aborted {
            let mut batch = MessageBatch::new(queue.last_id().to_string());
            batch.aborted = true;
            return Some(batch);
        }
        let pending: Vec<(u64, Value)> = queue
            .messages
            .iter()
            .filter(|(id, _)| *id > since_id)
            .take(max_buffered)
            .cloned()
            .collect();
        if pending.is_empty() {
            return None;
        }
        let mut batch = MessageBatch::new(since_id.to_string());
        for (id, message) in pending {
            batch.push(id.to_string(), message);
        }
        Some(batch)
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn receive(
        &self,
        connection: &ConnectionId,
        since: Option<String>,
        cancel: CancellationToken,
        max_buffered: usize,
    ) -> Result<MessageBatch, BoxError> {
        self.receive_calls.fetch_add(1, Ordering::SeqCst);

        // A first-time connect waits from the beginning of the backlog.
        let since_id: u64 = match since {
            Some(id) => id.parse().map_err(|_| "malformed message id")?,
            None => 0,
        };

        let notify = self.waker(connection);
        loop {
            if let Some(batch) = self.try_collect(connection, since_id, max_buffered) {
                return Ok(batch);
            }
            tokio::select! {
                () = cancel.cancelled() => return Ok(MessageBatch::new(since_id.to_string())),
                () = notify.notified() => {}
            }
        }
    }

    async fn abort(&self, connection: &ConnectionId) -> Result<(), BoxError> {
        self.abort_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut connections = self.connections.lock().expect("store lock");
            connections.entry(connection.clone()).or_default().aborted = true;
        }
        self.waker(connection).notify_one();
        Ok(())
    }
}

/// Store whose operations always fail, for error-propagation tests.
#[derive(Default)]
pub struct FailingStore;

#[async_trait]
impl MessageStore for FailingStore {
    async fn receive(
        &self,
        _connection: &ConnectionId,
        _since: Option<String>,
        _cancel: CancellationToken,
        _max_buffered: usize,
    ) -> Result<MessageBatch, BoxError> {
        Err("store receive failed".into())
    }

    async fn abort(&self, _connection: &ConnectionId) -> Result<(), BoxError> {
        Err("store abort failed".into())
    }
}

/// Response writer capturing everything the transport writes.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    content_type: Option<String>,
    body: BytesMut,
    finished: bool,
}

impl RecordingWriter {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// The content type set by the transport, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> { self.content_type.as_deref() }

    /// The accumulated body as UTF-8.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid UTF-8; transport output always is.
    #[must_use]
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).expect("transport output is UTF-8")
    }

    /// Whether the body has been finalized.
    #[must_use]
    pub fn is_finished(&self) -> bool { self.finished }

    /// Whether anything was written at all.
    #[must_use]
    pub fn wrote_anything(&self) -> bool { !self.body.is_empty() || self.content_type.is_some() }
}

#[async_trait]
impl ResponseWriter for RecordingWriter {
    fn set_content_type(&mut self, mime: &str) { self.content_type = Some(mime.to_owned()); }

    async fn write(&mut self, chunk: Bytes) -> Result<(), BoxError> {
        if self.finished {
            return Err("write after finish".into());
        }
        self.body.extend_from_slice(&chunk);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), BoxError> {
        if self.finished {
            return Err("double finish".into());
        }
        self.finished = true;
        Ok(())
    }
}

/// Response writer whose first write fails, for fatal-error tests.
#[derive(Debug, Default)]
pub struct FailingWriter;

#[async_trait]
impl ResponseWriter for FailingWriter {
    fn set_content_type(&mut self, _mime: &str) {}

    async fn write(&mut self, _chunk: Bytes) -> Result<(), BoxError> {
        Err("body write failed".into())
    }

    async fn finish(&mut self) -> Result<(), BoxError> { Err("finish failed".into()) }
}

/// Registry double counting calls while delegating to a real
/// [`HeartbeatRegistry`].
pub struct CountingRegistry {
    inner: HeartbeatRegistry,
    register_calls: AtomicUsize,
    mark_calls: AtomicUsize,
}

impl CountingRegistry {
    /// Create a counting registry with a generous disconnect threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: HeartbeatRegistry::new(std::time::Duration::from_secs(3600)),
            register_calls: AtomicUsize::new(0),
            mark_calls: AtomicUsize::new(0),
        }
    }

    /// Number of `register_if_new` calls observed.
    #[must_use]
    pub fn register_calls(&self) -> usize { self.register_calls.load(Ordering::SeqCst) }

    /// Number of `mark_active` calls observed.
    #[must_use]
    pub fn mark_calls(&self) -> usize { self.mark_calls.load(Ordering::SeqCst) }
}

impl Default for CountingRegistry {
    fn default() -> Self { Self::new() }
}

impl LivenessRegistry for CountingRegistry {
    fn register_if_new(&self, connection: &ConnectionId) -> Result<bool, BoxError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.register_if_new(connection)
    }

    fn mark_active(&self, connection: &ConnectionId) -> Result<(), BoxError> {
        self.mark_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.mark_active(connection)
    }
}

/// Registry whose operations always fail, for error-propagation tests.
#[derive(Default)]
pub struct FailingRegistry;

impl LivenessRegistry for FailingRegistry {
    fn register_if_new(&self, _connection: &ConnectionId) -> Result<bool, BoxError> {
        Err("registry register failed".into())
    }

    fn mark_active(&self, _connection: &ConnectionId) -> Result<(), BoxError> {
        Err("registry mark failed".into())
    }
}
