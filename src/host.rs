//! Host response boundary.
//!
//! The HTTP host owns the request/response plumbing; the transport only
//! writes a response body through this seam. Long polling is strictly
//! request/response: exactly one body write sequence per request, and no
//! further writes once the body has been finalized.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BoxError;

/// Write half of one HTTP response.
#[async_trait]
pub trait ResponseWriter: Send {
    /// Set the response content type. Must precede the first write.
    fn set_content_type(&mut self, mime: &str);

    /// Append a chunk to the response body.
    ///
    /// # Errors
    ///
    /// Write failures are fatal for the request; no partial output is
    /// considered committed.
    async fn write(&mut self, chunk: Bytes) -> Result<(), BoxError>;

    /// Finalize the response body. No writes may follow.
    ///
    /// # Errors
    ///
    /// Finalization failures are fatal for the request.
    async fn finish(&mut self) -> Result<(), BoxError>;
}

#[async_trait]
impl<W: ResponseWriter + ?Sized> ResponseWriter for &mut W {
    fn set_content_type(&mut self, mime: &str) { (**self).set_content_type(mime); }

    async fn write(&mut self, chunk: Bytes) -> Result<(), BoxError> { (**self).write(chunk).await }

    async fn finish(&mut self) -> Result<(), BoxError> { (**self).finish().await }
}
