//! Metric helpers for `longpoll`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. With the
//! `metrics` feature disabled every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking polls currently held open.
pub const POLLS_ACTIVE: &str = "longpoll_polls_active";
/// Name of the counter tracking message batches sent.
pub const BATCHES_SENT: &str = "longpoll_batches_sent_total";
/// Name of the counter tracking inbound send requests ingested.
pub const SENDS_INGESTED: &str = "longpoll_sends_ingested_total";
/// Name of the counter tracking request errors.
pub const ERRORS_TOTAL: &str = "longpoll_errors_total";

/// Increment the active polls gauge.
pub fn inc_polls() {
    #[cfg(feature = "metrics")]
    gauge!(POLLS_ACTIVE).increment(1.0);
}

/// Decrement the active polls gauge.
pub fn dec_polls() {
    #[cfg(feature = "metrics")]
    gauge!(POLLS_ACTIVE).decrement(1.0);
}

/// Record an outgoing message batch.
pub fn inc_batches() {
    #[cfg(feature = "metrics")]
    counter!(BATCHES_SENT).increment(1);
}

/// Record an ingested send request.
pub fn inc_sends() {
    #[cfg(feature = "metrics")]
    counter!(SENDS_INGESTED).increment(1);
}

/// Record a request error.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}
