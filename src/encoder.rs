//! Response encoding for message batches and arbitrary values.
//!
//! Serializes exactly one payload per request to the host's response
//! writer, then finalizes the body. Callback-wrapped (JSONP) output wraps
//! the payload in the client-named function call for cross-origin
//! script-tag delivery; plain output writes the JSON payload directly.

use bytes::Bytes;
use serde::Serialize;
use tracing::trace;

use crate::{
    error::{Result, TransportError},
    host::ResponseWriter,
};

/// Content type for plain JSON responses.
pub const JSON_MIME_TYPE: &str = "application/json; charset=UTF-8";

/// Content type for callback-wrapped responses.
pub const JSONP_MIME_TYPE: &str = "application/javascript; charset=UTF-8";

/// Serialize `value` to the response body and finalize it.
///
/// With `callback` present the body is `<callback>(<payload>);` under the
/// callback-wrapped MIME type; otherwise the payload is written directly
/// as plain JSON.
///
/// # Errors
///
/// Serialization failures surface as [`TransportError::Encode`] and write
/// or finalization failures as [`TransportError::Body`]; both are fatal
/// for the request.
pub async fn send_json<W, T>(writer: &mut W, value: &T, callback: Option<&str>) -> Result<()>
where
    W: ResponseWriter,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(value).map_err(TransportError::Encode)?;
    trace!(bytes = payload.len(), jsonp = callback.is_some(), "encoding response");

    match callback {
        Some(name) => {
            writer.set_content_type(JSONP_MIME_TYPE);
            writer
                .write(Bytes::from(format!("{name}(")))
                .await
                .map_err(TransportError::Body)?;
            writer
                .write(Bytes::from(payload))
                .await
                .map_err(TransportError::Body)?;
            writer
                .write(Bytes::from_static(b");"))
                .await
                .map_err(TransportError::Body)?;
        }
        None => {
            writer.set_content_type(JSON_MIME_TYPE);
            writer
                .write(Bytes::from(payload))
                .await
                .map_err(TransportError::Body)?;
        }
    }

    writer.finish().await.map_err(TransportError::Body)
}
