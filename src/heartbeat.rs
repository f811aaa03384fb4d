//! Liveness tracking for long-polled connections.
//!
//! The transport reads and writes liveness through the [`LivenessRegistry`]
//! trait; [`HeartbeatRegistry`] is a concurrent default implementation
//! recording per-connection last-active instants so periodic sweeps can
//! detect silent disconnects. Entries are pruned opportunistically, never
//! owned by the transport.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::info;

use crate::{error::BoxError, request::ConnectionId};

/// Per-connection liveness bookkeeping consulted by heartbeat sweeps.
///
/// Failures from either operation are fatal for the request being
/// processed; the transport never retries them.
pub trait LivenessRegistry: Send + Sync {
    /// Record `connection` if it is not yet known.
    ///
    /// Returns `true` exactly once per connection lifetime, on the call
    /// that first registered it.
    ///
    /// # Errors
    ///
    /// Registry failures propagate as fatal for the request.
    fn register_if_new(&self, connection: &ConnectionId) -> Result<bool, BoxError>;

    /// Refresh `connection`'s last-active instant.
    ///
    /// Called whenever an outgoing message batch is sent, so sweeps do not
    /// prematurely disconnect an active client.
    ///
    /// # Errors
    ///
    /// Registry failures propagate as fatal for the request.
    fn mark_active(&self, connection: &ConnectionId) -> Result<(), BoxError>;
}

/// Concurrent registry of connection liveness records.
pub struct HeartbeatRegistry {
    entries: DashMap<ConnectionId, Instant>,
    disconnect_threshold: Duration,
}

impl HeartbeatRegistry {
    /// Create a registry reaping connections quiet for longer than
    /// `disconnect_threshold`.
    #[must_use]
    pub fn new(disconnect_threshold: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            disconnect_threshold,
        }
    }

    /// The configured silent-disconnect window.
    #[must_use]
    pub fn disconnect_threshold(&self) -> Duration { self.disconnect_threshold }

    /// The last-active instant recorded for `connection`, if known.
    #[must_use]
    pub fn last_active(&self, connection: &ConnectionId) -> Option<Instant> {
        self.entries.get(connection).map(|entry| *entry.value())
    }

    /// Remove and return the connections whose last activity predates the
    /// disconnect threshold.
    ///
    /// `DashMap::retain` acquires per-bucket write locks, so other
    /// operations may contend briefly while the registry is swept.
    pub fn sweep_stale(&self) -> Vec<ConnectionId> {
        let cutoff = Instant::now();
        let mut stale = Vec::new();
        self.entries.retain(|id, last_active| {
            if cutoff.duration_since(*last_active) > self.disconnect_threshold {
                stale.push(id.clone());
                false
            } else {
                true
            }
        });
        if !stale.is_empty() {
            info!(
                "heartbeat sweep reaped {} stale connection(s), {} remaining",
                stale.len(),
                self.entries.len()
            );
        }
        stale
    }

    /// Forget `connection` entirely, typically after an abort.
    pub fn remove(&self, connection: &ConnectionId) { self.entries.remove(connection); }
}

impl LivenessRegistry for HeartbeatRegistry {
    fn register_if_new(&self, connection: &ConnectionId) -> Result<bool, BoxError> {
        let mut is_new = false;
        self.entries
            .entry(connection.clone())
            .or_insert_with(|| {
                is_new = true;
                Instant::now()
            });
        Ok(is_new)
    }

    fn mark_active(&self, connection: &ConnectionId) -> Result<(), BoxError> {
        self.entries.insert(connection.clone(), Instant::now());
        Ok(())
    }
}
