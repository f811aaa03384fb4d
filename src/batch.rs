//! Message batch types produced by a receive operation.
//!
//! A [`MessageBatch`] is the unit of data returned per poll: zero or more
//! ordered messages since a given message id, the new last id, status flags,
//! and an open metadata mapping any transport may enrich before encoding.

use std::{collections::BTreeMap, time::Duration};

use serde::Serialize;
use serde_json::Value;

/// Metadata key carrying the suggested client re-poll delay in milliseconds.
pub const LONG_POLL_DELAY_KEY: &str = "LongPollDelay";

/// Ordered batch of messages delivered by a single receive operation.
///
/// Created per receive operation by the connection's message store and
/// discarded after encoding. The transport mutates only the metadata
/// mapping, never the message content or ordering.
#[derive(Clone, Debug, Serialize)]
pub struct MessageBatch {
    /// Messages ordered by non-decreasing message id.
    #[serde(rename = "messages")]
    pub messages: Vec<Value>,
    /// Id of the last message in the batch, echoed back by the client on
    /// its next poll.
    #[serde(rename = "lastMessageId")]
    pub last_message_id: String,
    /// Set when the store detected a clean client-initiated disconnect.
    #[serde(rename = "aborted")]
    pub aborted: bool,
    /// Set when the poll ended due to the inactivity cutoff rather than
    /// real messages, telling the client to reconnect without back-off.
    #[serde(rename = "timedOut")]
    pub timed_out: bool,
    /// Transport-specific hints, serialized inline with the batch.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

impl MessageBatch {
    /// Create an empty batch positioned at `last_message_id`.
    #[must_use]
    pub fn new(last_message_id: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            last_message_id: last_message_id.into(),
            aborted: false,
            timed_out: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Create an empty batch marking an expired poll.
    #[must_use]
    pub fn timed_out(last_message_id: impl Into<String>) -> Self {
        let mut batch = Self::new(last_message_id);
        batch.timed_out = true;
        batch
    }

    /// Append a message, advancing the batch's last id.
    pub fn push(&mut self, id: impl Into<String>, message: Value) {
        self.messages.push(message);
        self.last_message_id = id.into();
    }

    /// Attach the re-poll delay hint when one is configured.
    ///
    /// A zero delay leaves the metadata untouched; clients then re-poll
    /// immediately. Side-effect only, message content is never altered.
    pub fn apply_poll_delay_hint(&mut self, delay: Duration) {
        if !delay.is_zero() {
            self.metadata.insert(
                LONG_POLL_DELAY_KEY.to_owned(),
                Value::from(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)),
            );
        }
    }
}
