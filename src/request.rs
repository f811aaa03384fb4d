//! Request classification and per-request context.
//!
//! Each incoming HTTP request is classified into a [`RequestKind`] from its
//! URL suffix and query/form parameters alone; classification is pure and
//! has no side effects. A request additionally wants callback-wrapped
//! (JSONP-style) output whenever its `callback` query parameter is
//! non-empty — that flag affects only the response encoder, never the
//! classification itself.

use url::form_urlencoded;

/// Query parameter naming the last message id seen by the client.
const MESSAGE_ID_PARAM: &str = "messageId";
/// Query parameter naming the JSONP callback function.
const CALLBACK_PARAM: &str = "callback";
/// Query or form key carrying a client-submitted payload.
const DATA_PARAM: &str = "data";

/// Opaque identifier naming a logical client connection.
///
/// Stable across polls; the same identity is presented on every request of
/// a connection's session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a new [`ConnectionId`] from the provided identity string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    /// Return the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of work an incoming request asks the transport to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Ingest a client-submitted message and return.
    Send,
    /// Tear down the connection via the message store.
    Abort,
    /// First request of a session; waits from the beginning of the backlog.
    Connect,
    /// Client re-established after a dropped poll; resumes from its last id.
    Reconnect,
    /// Plain long poll resuming from the client-supplied message id.
    Poll,
}

/// The transport-visible slice of one HTTP request.
///
/// Holds the connection identity, the request path, decoded query and form
/// pairs, and the host-detected abort signal. Scoped to a single request
/// and discarded once it completes.
#[derive(Debug)]
pub struct PollRequest {
    connection_id: ConnectionId,
    path: String,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    abort_requested: bool,
}

impl PollRequest {
    /// Create a request context for `connection_id` addressing `path`.
    #[must_use]
    pub fn new(connection_id: ConnectionId, path: impl Into<String>) -> Self {
        Self {
            connection_id,
            path: path.into(),
            query: Vec::new(),
            form: Vec::new(),
            abort_requested: false,
        }
    }

    /// Attach the raw query string, replacing any previously decoded pairs.
    #[must_use]
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query = decode_pairs(raw);
        self
    }

    /// Attach the form-encoded request body, replacing any previous pairs.
    #[must_use]
    pub fn with_form_body(mut self, raw: &str) -> Self {
        self.form = decode_pairs(raw);
        self
    }

    /// Flag the request as carrying a host-detected abort signal.
    #[must_use]
    pub fn with_abort_requested(mut self, abort: bool) -> Self {
        self.abort_requested = abort;
        self
    }

    /// The connection identity this request belongs to.
    #[must_use]
    pub fn connection_id(&self) -> &ConnectionId { &self.connection_id }

    /// The request path.
    #[must_use]
    pub fn path(&self) -> &str { &self.path }

    /// Look up the first query parameter named `key`.
    #[must_use]
    pub fn query(&self, key: &str) -> Option<&str> { lookup(&self.query, key) }

    /// Look up the first form field named `key`.
    #[must_use]
    pub fn form(&self, key: &str) -> Option<&str> { lookup(&self.form, key) }

    /// Classify the request by URL suffix and parameters.
    ///
    /// Returns `None` when the request matches no known kind; the caller
    /// takes no action for such requests.
    #[must_use]
    pub fn classify(&self) -> Option<RequestKind> {
        if self.path.ends_with("/send") {
            Some(RequestKind::Send)
        } else if self.abort_requested {
            Some(RequestKind::Abort)
        } else if self.path.ends_with("/connect") {
            Some(RequestKind::Connect)
        } else if self.path.ends_with("/reconnect") {
            Some(RequestKind::Reconnect)
        } else if self.message_id().is_some() {
            Some(RequestKind::Poll)
        } else {
            None
        }
    }

    /// The client-supplied last-seen message id, if any.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> { self.query(MESSAGE_ID_PARAM) }

    /// The JSONP callback name when callback-wrapped output is requested.
    ///
    /// An empty `callback` parameter does not count as a request for
    /// wrapped output.
    #[must_use]
    pub fn callback_name(&self) -> Option<&str> {
        self.query(CALLBACK_PARAM).filter(|name| !name.is_empty())
    }

    /// The client-submitted payload of a send request.
    ///
    /// Callback-wrapped requests carry the payload in the query string;
    /// plain requests carry it in the form body, both under the `data` key.
    #[must_use]
    pub fn payload(&self) -> Option<&str> {
        if self.callback_name().is_some() {
            self.query(DATA_PARAM)
        } else {
            self.form(DATA_PARAM)
        }
    }
}

fn decode_pairs(raw: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

fn lookup<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}
