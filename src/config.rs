//! Transport configuration.
//!
//! This module defines the per-instance settings governing how long a poll
//! is held open, the client re-poll delay hint, and the buffered-message
//! bound used as a backpressure release valve.

use std::time::Duration;

/// Default number of messages a single wait may buffer before it is forced
/// to flush.
pub const DEFAULT_MAX_BUFFERED_MESSAGES: usize = 5000;

/// Default inactivity cutoff for a held poll.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(110);

/// Settings for a [`LongPollingTransport`](crate::transport::LongPollingTransport).
///
/// Configuration is explicit and per-instance rather than process-global so
/// tests can supply distinct values to independent transports. All
/// connections served by one transport instance share the same values.
#[derive(Clone, Copy, Debug)]
pub struct LongPollingConfig {
    /// Suggested delay before the client issues its next poll. A non-zero
    /// value is attached to every outgoing batch as the `LongPollDelay`
    /// metadata entry; zero suppresses the hint entirely.
    pub poll_delay: Duration,
    /// How long a poll with no traffic is held before it is answered with
    /// an empty batch flagged as timed out.
    pub poll_timeout: Duration,
    /// Maximum number of messages a single wait may accumulate before the
    /// store is forced to flush them, bounding memory under slow consumers.
    pub max_buffered_messages: usize,
}

impl LongPollingConfig {
    /// Create a configuration with no re-poll delay and the default timeout
    /// and buffering bounds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            poll_delay: Duration::ZERO,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            max_buffered_messages: DEFAULT_MAX_BUFFERED_MESSAGES,
        }
    }

    /// Set the suggested client re-poll delay.
    #[must_use]
    pub const fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Set the inactivity cutoff for a held poll.
    #[must_use]
    pub const fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the buffered-message bound.
    #[must_use]
    pub const fn with_max_buffered_messages(mut self, max: usize) -> Self {
        self.max_buffered_messages = max;
        self
    }

    /// Window after which a connection with no liveness refresh is
    /// considered silently disconnected.
    ///
    /// A healthy client is quiet for at most one full poll plus the re-poll
    /// delay, so the threshold covers that span with one extra delay of
    /// slack before heartbeat sweeps may reap the connection.
    #[must_use]
    pub fn disconnect_threshold(&self) -> Duration {
        self.poll_timeout + self.poll_delay * 2
    }
}

impl Default for LongPollingConfig {
    fn default() -> Self { Self::new() }
}
