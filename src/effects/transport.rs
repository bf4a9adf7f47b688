use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::core::ByteRange;
use crate::data::{ObjectHandle, ObjectMetadata};
use crate::error::{ReadError, Result};

/// A boxed stream of body chunks from an open content request.
pub type BoxByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// One opened content request: the body plus what the server reported about
/// it.
pub struct RangeBody {
    pub stream: BoxByteStream,
    /// Object offset of the first byte the stream will yield. May differ
    /// from the requested offset when the server ignores the range.
    pub first_byte: u64,
    /// Content-Encoding of the response, if any.
    pub content_encoding: Option<String>,
}

/// Executes single requests against the blob service.
///
/// Implementations do not retry; the callers layer backoff on top. Two
/// transports can sit behind this trait (the HTTP/JSON one shipped here and
/// a streaming RPC one); they are interchangeable.
#[async_trait]
pub trait StorageTransport: Send + Sync {
    /// Fetch size, generation and content encoding of an object. A pinned
    /// generation on the handle is part of the request, so a missing
    /// generation surfaces as [`ReadError::NotFound`].
    async fn fetch_metadata(&self, handle: &ObjectHandle) -> Result<ObjectMetadata>;

    /// Open a ranged content request. `generation`, when present, pins the
    /// request to one content snapshot and overrides any pinning on the
    /// handle; a mismatch surfaces as [`ReadError::NotFound`].
    async fn open_range(
        &self,
        handle: &ObjectHandle,
        range: ByteRange,
        generation: Option<i64>,
    ) -> Result<RangeBody>;
}

/// Map a non-success HTTP status to the error taxonomy: 404 is not-found,
/// 408/429 and server errors are transient, everything else is fatal.
pub fn error_for_status(status: u16, context: &str) -> ReadError {
    match status {
        404 => ReadError::NotFound(context.to_string()),
        408 | 429 | 500..=599 => ReadError::Transient(format!("status {status}: {context}")),
        _ => ReadError::Fatal(format!("status {status}: {context}")),
    }
}
