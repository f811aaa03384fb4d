//! Per-request lifecycle state tracking.

use tracing::trace;

use crate::request::ConnectionId;

/// Phase of a single receive request.
///
/// Terminal phases each lead to exactly one response write, or to no
/// response at all when the request was cancelled before any write began.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum PollPhase {
    /// Request classified, nothing started yet.
    Idle,
    /// Liveness registered with the heartbeat registry.
    LivenessRegistered,
    /// Awaiting the message wait (and any interleaved callback).
    Waiting,
    /// Batch encoded and written.
    Completed,
    /// Cancellation fired before a write started; no response.
    Cancelled,
    /// The request ended in a fatal error.
    Faulted,
}

/// Tracks one request's progress through the receive loop.
pub(super) struct PollState {
    connection: ConnectionId,
    phase: PollPhase,
}

impl PollState {
    pub(super) fn new(connection: &ConnectionId) -> Self {
        Self {
            connection: connection.clone(),
            phase: PollPhase::Idle,
        }
    }

    #[cfg(test)]
    pub(super) fn phase(&self) -> PollPhase { self.phase }

    pub(super) fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            PollPhase::Completed | PollPhase::Cancelled | PollPhase::Faulted
        )
    }

    pub(super) fn mark_registered(&mut self) { self.transition(PollPhase::LivenessRegistered); }

    pub(super) fn mark_waiting(&mut self) { self.transition(PollPhase::Waiting); }

    pub(super) fn mark_completed(&mut self) { self.transition(PollPhase::Completed); }

    pub(super) fn mark_cancelled(&mut self) { self.transition(PollPhase::Cancelled); }

    fn transition(&mut self, next: PollPhase) {
        trace!(connection = %self.connection, from = ?self.phase, to = ?next, "poll state");
        self.phase = next;
    }
}

impl Drop for PollState {
    /// A request abandoned mid-flight (early error return) faults.
    fn drop(&mut self) {
        if !self.is_terminal() {
            self.transition(PollPhase::Faulted);
        }
    }
}
