//! Error types for the long-polling transport.

use thiserror::Error;

/// Boxed error type used at collaborator seams.
///
/// The message store, liveness registry, response writer, and lifecycle
/// callbacks all report failures through this type so the transport can
/// wrap them without knowing their concrete error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal errors raised while processing a single request.
///
/// Transient wait cancellation, poll timeouts, and clean client aborts are
/// not errors; they surface through the message batch flags instead. Every
/// variant here aborts the request and is propagated to the host, never
/// retried internally.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The message store failed while receiving or aborting.
    #[error("message store error: {0}")]
    Store(#[source] BoxError),
    /// The liveness registry failed to register or refresh a connection.
    #[error("liveness registry error: {0}")]
    Registry(#[source] BoxError),
    /// Serializing the response payload failed.
    #[error("response encoding error: {0}")]
    Encode(#[source] serde_json::Error),
    /// Writing or finalizing the response body failed.
    #[error("response body error: {0}")]
    Body(#[source] BoxError),
    /// A lifecycle callback supplied by the application failed.
    #[error("lifecycle callback error: {0}")]
    Callback(#[source] BoxError),
}

/// Result type alias used by the transport's public APIs.
pub type Result<T> = std::result::Result<T, TransportError>;
