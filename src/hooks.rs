//! Lifecycle callbacks supplied by the application layer.
//!
//! [`LifecycleHooks`] stores optional, independently-settable callbacks the
//! transport invokes at connection lifecycle points. Absence is a valid and
//! common state: a connection with no application-level hook still
//! participates fully in send and poll handling.

use futures::future::BoxFuture;

use crate::error::{BoxError, TransportError};

/// Completion of an asynchronous lifecycle callback.
pub type CompletionSignal = BoxFuture<'static, Result<(), BoxError>>;

/// Type alias for session-level callbacks (`connected`, `reconnected`,
/// `disconnected`, `transport connected`).
type SessionHook = Box<dyn FnMut() -> CompletionSignal + Send>;

/// Type alias for the inbound message handler.
type ReceivedHook = Box<dyn FnMut(String) -> CompletionSignal + Send>;

/// Type alias for the error observer.
type ErrorHook = Box<dyn FnMut(&TransportError) + Send>;

/// Optional callbacks invoked around a connection's lifecycle.
#[derive(Default)]
pub struct LifecycleHooks {
    on_connected: Option<SessionHook>,
    on_reconnected: Option<SessionHook>,
    on_received: Option<ReceivedHook>,
    on_disconnected: Option<SessionHook>,
    on_transport_connected: Option<SessionHook>,
    on_error: Option<ErrorHook>,
}

impl LifecycleHooks {
    /// Create a hook set with every callback absent.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Install the callback fired once per session when a connection is
    /// first established.
    #[must_use]
    pub fn on_connected(mut self, hook: impl FnMut() -> CompletionSignal + Send + 'static) -> Self {
        self.on_connected = Some(Box::new(hook));
        self
    }

    /// Install the callback fired when a client re-establishes after a
    /// dropped poll.
    #[must_use]
    pub fn on_reconnected(
        mut self,
        hook: impl FnMut() -> CompletionSignal + Send + 'static,
    ) -> Self {
        self.on_reconnected = Some(Box::new(hook));
        self
    }

    /// Install the handler for client-submitted payloads.
    #[must_use]
    pub fn on_received(
        mut self,
        hook: impl FnMut(String) -> CompletionSignal + Send + 'static,
    ) -> Self {
        self.on_received = Some(Box::new(hook));
        self
    }

    /// Install the callback fired when the store reports a clean
    /// client-initiated disconnect.
    #[must_use]
    pub fn on_disconnected(
        mut self,
        hook: impl FnMut() -> CompletionSignal + Send + 'static,
    ) -> Self {
        self.on_disconnected = Some(Box::new(hook));
        self
    }

    /// Install the fire-and-forget callback run at the start of every
    /// receive request; its errors are swallowed.
    #[must_use]
    pub fn on_transport_connected(
        mut self,
        hook: impl FnMut() -> CompletionSignal + Send + 'static,
    ) -> Self {
        self.on_transport_connected = Some(Box::new(hook));
        self
    }

    /// Install the observer invoked with the final error of a faulted
    /// request before it propagates to the host.
    #[must_use]
    pub fn on_error(mut self, hook: impl FnMut(&TransportError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Whether a connected callback is registered.
    #[must_use]
    pub fn has_connected(&self) -> bool { self.on_connected.is_some() }

    /// Whether a reconnected callback is registered.
    #[must_use]
    pub fn has_reconnected(&self) -> bool { self.on_reconnected.is_some() }

    /// Invoke the connected callback if registered, returning its
    /// completion.
    pub fn connected(&mut self) -> Option<CompletionSignal> {
        self.on_connected.as_mut().map(|hook| hook())
    }

    /// Invoke the reconnected callback if registered, returning its
    /// completion.
    pub fn reconnected(&mut self) -> Option<CompletionSignal> {
        self.on_reconnected.as_mut().map(|hook| hook())
    }

    /// Invoke the inbound message handler if registered, returning its
    /// completion.
    pub fn received(&mut self, payload: String) -> Option<CompletionSignal> {
        self.on_received.as_mut().map(|hook| hook(payload))
    }

    /// Invoke the disconnected callback if registered, returning its
    /// completion.
    pub fn disconnected(&mut self) -> Option<CompletionSignal> {
        self.on_disconnected.as_mut().map(|hook| hook())
    }

    /// Invoke the transport-connected callback if registered, returning
    /// its completion.
    pub fn transport_connected(&mut self) -> Option<CompletionSignal> {
        self.on_transport_connected.as_mut().map(|hook| hook())
    }

    /// Run the error observer if registered.
    pub fn error(&mut self, error: &TransportError) {
        if let Some(hook) = &mut self.on_error {
            hook(error);
        }
    }
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("on_connected", &self.on_connected.is_some())
            .field("on_reconnected", &self.on_reconnected.is_some())
            .field("on_received", &self.on_received.is_some())
            .field("on_disconnected", &self.on_disconnected.is_some())
            .field("on_transport_connected", &self.on_transport_connected.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
