//! Message store boundary.
//!
//! The connection's message store owns queueing, persistence, and
//! message-id sequencing; the transport only issues receive and abort
//! calls against it. The store must be internally safe for concurrent
//! access from many connections; for a single connection, polls arrive
//! sequentially.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{batch::MessageBatch, error::BoxError, request::ConnectionId};

/// Store of per-connection message backlogs consumed by the transport.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Wait for the next batch of messages for `connection`.
    ///
    /// `since` is `None` on a first-time connect (deliver from the start of
    /// the connection's backlog, or from now when no backlog applies) and
    /// the client-supplied id otherwise. The wait resumes when at least one
    /// message is available, when `max_buffered` messages have accumulated
    /// (forcing a flush to cap memory), or when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Store failures are fatal for the request and propagate to the host.
    async fn receive(
        &self,
        connection: &ConnectionId,
        since: Option<String>,
        cancel: CancellationToken,
        max_buffered: usize,
    ) -> Result<MessageBatch, BoxError>;

    /// Tear down `connection`, releasing any pending wait with an aborted
    /// batch.
    ///
    /// # Errors
    ///
    /// Store failures are fatal for the request and propagate to the host.
    async fn abort(&self, connection: &ConnectionId) -> Result<(), BoxError>;
}
