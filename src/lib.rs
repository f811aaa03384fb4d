//! Public API for the `longpoll` library.
//!
//! This crate provides the long-polling half-duplex transport for a
//! server-push messaging protocol: request classification, per-connection
//! liveness registration, a bounded cancellable wait for new messages with
//! the connect/reconnect interleave ordering guarantee, and JSON/JSONP
//! response encoding. The HTTP host, the message store, and the liveness
//! registry's bookkeeping are external collaborators reached through the
//! traits in [`host`], [`store`], and [`heartbeat`].

pub mod batch;
pub mod config;
pub mod encoder;
pub mod error;
pub mod heartbeat;
pub mod hooks;
pub mod host;
pub mod metrics;
pub mod request;
pub mod store;
pub mod test_support;
pub mod transport;

pub use batch::{LONG_POLL_DELAY_KEY, MessageBatch};
pub use config::{DEFAULT_MAX_BUFFERED_MESSAGES, DEFAULT_POLL_TIMEOUT, LongPollingConfig};
pub use encoder::{JSON_MIME_TYPE, JSONP_MIME_TYPE};
pub use error::{BoxError, Result, TransportError};
pub use heartbeat::{HeartbeatRegistry, LivenessRegistry};
pub use hooks::{CompletionSignal, LifecycleHooks};
pub use host::ResponseWriter;
pub use request::{ConnectionId, PollRequest, RequestKind};
pub use store::MessageStore;
pub use transport::{LongPollingTransport, Outcome, RequestContext};
