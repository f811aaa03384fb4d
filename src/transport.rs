//! Request-lifecycle core of the long-polling transport.
//!
//! Every request enters [`LongPollingTransport::process_request`], which
//! classifies it and either ingests a client message (send), tears the
//! connection down (abort), or registers liveness and runs the receive
//! loop (connect, reconnect, poll). The receive loop issues a bounded,
//! cancellable wait on the message store and, for lifecycle-callback
//! bearing connects and reconnects, starts that wait *before* invoking the
//! callback so a message published as a side effect of the callback cannot
//! fall into the gap between registration and waiting. The request only
//! completes once both the wait and the callback have finished.

mod state;

use std::sync::Arc;

use futures::future;
use serde::Serialize;
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    batch::MessageBatch,
    config::LongPollingConfig,
    encoder,
    error::{Result, TransportError},
    heartbeat::LivenessRegistry,
    hooks::{CompletionSignal, LifecycleHooks},
    host::ResponseWriter,
    metrics,
    request::{ConnectionId, PollRequest, RequestKind},
    store::MessageStore,
};
use state::PollState;

/// How a request was disposed of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The request matched a known kind and was processed.
    Handled,
    /// The request matched no known kind; no action was taken and no
    /// response was produced.
    Ignored,
}

/// Everything the transport needs to process one request.
///
/// Scoped to a single request and not retained past its completion. The
/// cancellation token is the composite signal covering client disconnect,
/// explicit abort, and host shutdown.
#[derive(Debug)]
pub struct RequestContext<W> {
    /// The classified request and its parameters.
    pub request: PollRequest,
    /// Write half of the response.
    pub response: W,
    /// Application-supplied lifecycle callbacks; all optional.
    pub hooks: LifecycleHooks,
    /// Composite cancellation signal for this request.
    pub cancellation: CancellationToken,
}

impl<W> RequestContext<W> {
    /// Create a context with no hooks and a fresh cancellation token.
    #[must_use]
    pub fn new(request: PollRequest, response: W) -> Self {
        Self {
            request,
            response,
            hooks: LifecycleHooks::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Attach lifecycle callbacks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: LifecycleHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Replace the cancellation token with the host's composite signal.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }
}

/// Tracks one held poll on the active-polls gauge.
struct ActivePoll;

impl ActivePoll {
    fn new() -> Self {
        metrics::inc_polls();
        Self
    }
}

impl Drop for ActivePoll {
    fn drop(&mut self) { metrics::dec_polls(); }
}

/// Long-polling half-duplex transport over request/response HTTP.
///
/// The store and registry are externally-synchronized singletons shared by
/// every connection; the transport issues calls against them and never
/// caches their state across requests. One instance serves many
/// connections concurrently; for a given connection the host is expected
/// to issue polls sequentially, never concurrently.
pub struct LongPollingTransport<S, R> {
    store: Arc<S>,
    registry: Arc<R>,
    config: LongPollingConfig,
}

impl<S, R> LongPollingTransport<S, R>
where
    S: MessageStore + 'static,
    R: LivenessRegistry,
{
    /// Create a transport over the given store and liveness registry.
    #[must_use]
    pub fn new(store: Arc<S>, registry: Arc<R>, config: LongPollingConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// The configuration this transport was built with.
    #[must_use]
    pub fn config(&self) -> &LongPollingConfig { &self.config }

    /// Process one request to completion.
    ///
    /// Returns [`Outcome::Ignored`] without touching the response when the
    /// request matches no known kind.
    ///
    /// # Errors
    ///
    /// Store, registry, encoding, body, and lifecycle-callback failures
    /// are fatal for the request and propagate to the host after the
    /// error observer hook has run. Cancellation, poll timeout, and clean
    /// client aborts are not errors.
    pub async fn process_request<W: ResponseWriter>(
        &self,
        mut ctx: RequestContext<W>,
    ) -> Result<Outcome> {
        let Some(kind) = ctx.request.classify() else {
            warn!(
                connection = %ctx.request.connection_id(),
                path = ctx.request.path(),
                "request matched no transport operation; ignoring"
            );
            return Ok(Outcome::Ignored);
        };
        debug!(connection = %ctx.request.connection_id(), ?kind, "processing request");

        let result = match kind {
            RequestKind::Send => self.process_send(&mut ctx).await,
            RequestKind::Abort => self.process_abort(&ctx).await,
            RequestKind::Connect | RequestKind::Reconnect | RequestKind::Poll => {
                self.process_receive(&mut ctx, kind).await
            }
        };

        match result {
            Ok(()) => Ok(Outcome::Handled),
            Err(error) => {
                ctx.hooks.error(&error);
                metrics::inc_errors();
                Err(error)
            }
        }
    }

    /// Serialize a message batch to `writer`, refreshing liveness and
    /// attaching transport metadata first.
    ///
    /// # Errors
    ///
    /// Registry, encoding, and body failures are fatal for the request.
    pub async fn send_batch<W: ResponseWriter>(
        &self,
        writer: &mut W,
        connection: &ConnectionId,
        mut batch: MessageBatch,
        callback: Option<&str>,
    ) -> Result<()> {
        self.registry
            .mark_active(connection)
            .map_err(TransportError::Registry)?;
        batch.apply_poll_delay_hint(self.config.poll_delay);
        metrics::inc_batches();
        encoder::send_json(writer, &batch, callback).await
    }

    /// Serialize an arbitrary value to `writer`.
    ///
    /// Unlike [`send_batch`](Self::send_batch), this neither refreshes
    /// liveness nor attaches transport metadata.
    ///
    /// # Errors
    ///
    /// Encoding and body failures are fatal for the request.
    pub async fn send_value<W, T>(
        &self,
        writer: &mut W,
        value: &T,
        callback: Option<&str>,
    ) -> Result<()>
    where
        W: ResponseWriter,
        T: Serialize + ?Sized,
    {
        encoder::send_json(writer, value, callback).await
    }

    /// Ingest a client-submitted payload and forward it to the
    /// application's message handler.
    ///
    /// This path never touches the receive loop, never holds the request
    /// open, and writes no body; the handler's completion is the
    /// request's completion.
    async fn process_send<W: ResponseWriter>(&self, ctx: &mut RequestContext<W>) -> Result<()> {
        let payload = ctx.request.payload().unwrap_or_default().to_owned();
        if let Some(signal) = ctx.hooks.received(payload) {
            signal.await.map_err(TransportError::Callback)?;
        }
        metrics::inc_sends();
        Ok(())
    }

    /// Tear down the connection via the store, bypassing the receive loop.
    async fn process_abort<W>(&self, ctx: &RequestContext<W>) -> Result<()> {
        debug!(connection = %ctx.request.connection_id(), "aborting connection");
        self.store
            .abort(ctx.request.connection_id())
            .await
            .map_err(TransportError::Store)
    }

    /// Run the receive loop: produce exactly one batch, honoring
    /// cancellation and the interleave ordering rule.
    async fn process_receive<W: ResponseWriter>(
        &self,
        ctx: &mut RequestContext<W>,
        kind: RequestKind,
    ) -> Result<()> {
        let connection = ctx.request.connection_id().clone();
        let mut poll_state = PollState::new(&connection);
        let _active = ActivePoll::new();

        if let Some(signal) = ctx.hooks.transport_connected() {
            // Fire and forget; failures are swallowed.
            tokio::spawn(async move {
                if let Err(error) = signal.await {
                    debug!(%error, "transport connected callback failed");
                }
            });
        }

        // Connect waits from the beginning of the connection's backlog;
        // reconnect and poll resume from the client-supplied id.
        let since = if kind == RequestKind::Connect {
            None
        } else {
            ctx.request.message_id().map(str::to_owned)
        };

        let interleave = match kind {
            RequestKind::Connect => ctx.hooks.has_connected(),
            RequestKind::Reconnect => ctx.hooks.has_reconnected(),
            _ => false,
        };

        // A connect or reconnect with no lifecycle callback degenerates to
        // a plain poll: liveness is registered before the wait begins.
        if !interleave {
            self.registry
                .register_if_new(&connection)
                .map_err(TransportError::Registry)?;
            poll_state.mark_registered();
        }

        let wait = self.spawn_wait(connection.clone(), since, ctx.cancellation.clone());

        let lifecycle: Option<CompletionSignal> = if interleave {
            // The wait above is already running; registering and invoking
            // the callback here keeps both inside the combined operation,
            // so a message published by the callback lands in the wait.
            let is_new = match self.registry.register_if_new(&connection) {
                Ok(is_new) => is_new,
                Err(error) => {
                    wait.abort();
                    return Err(TransportError::Registry(error));
                }
            };
            poll_state.mark_registered();
            match kind {
                RequestKind::Connect if is_new => ctx.hooks.connected(),
                RequestKind::Reconnect => ctx.hooks.reconnected(),
                _ => None,
            }
        } else {
            None
        };

        poll_state.mark_waiting();
        let (wait_result, lifecycle_result) = match lifecycle {
            Some(signal) => {
                let (wait_result, lifecycle_result) = future::join(wait, signal).await;
                (wait_result, Some(lifecycle_result))
            }
            None => (wait.await, None),
        };

        let batch = match wait_result {
            Ok(result) => result?,
            Err(join_error) => return Err(TransportError::Store(Box::new(join_error))),
        };

        let Some(batch) = batch else {
            // Cancelled before anything was written: no response at all.
            poll_state.mark_cancelled();
            return Ok(());
        };

        if batch.aborted {
            // Clean client-initiated disconnect; notified exactly once.
            if let Some(signal) = ctx.hooks.disconnected() {
                signal.await.map_err(TransportError::Callback)?;
            }
        }

        let callback = ctx.request.callback_name().map(str::to_owned);
        self.send_batch(&mut ctx.response, &connection, batch, callback.as_deref())
            .await?;

        if let Some(Err(error)) = lifecycle_result {
            // The batch already went out; the callback failure is still
            // surfaced to the host rather than dropped.
            return Err(TransportError::Callback(error));
        }

        poll_state.mark_completed();
        Ok(())
    }

    /// Start the bounded, cancellable wait for the next batch.
    ///
    /// Spawning makes the wait live immediately, which is what lets the
    /// interleave rule order "wait started" before "callback invoked".
    fn spawn_wait(
        &self,
        connection: ConnectionId,
        since: Option<String>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<Option<MessageBatch>>> {
        let store = Arc::clone(&self.store);
        let poll_timeout = self.config.poll_timeout;
        let max_buffered = self.config.max_buffered_messages;
        tokio::spawn(async move {
            let position = since.clone().unwrap_or_else(|| "0".to_owned());
            tokio::select! {
                biased;

                () = cancel.cancelled() => Ok(None),
                () = time::sleep(poll_timeout) => Ok(Some(MessageBatch::timed_out(position))),
                result = store.receive(&connection, since, cancel.clone(), max_buffered) => {
                    result.map(Some).map_err(TransportError::Store)
                }
            }
        })
    }
}
