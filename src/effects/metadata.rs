use std::sync::Arc;

use crate::data::{ObjectHandle, ObjectMetadata, ReadOptions};
use crate::effects::retry::run_with_backoff;
use crate::effects::transport::StorageTransport;
use crate::error::{ReadError, Result};
use crate::stats::ChannelStats;

/// Fetch object metadata and enforce the channel's gzip and generation
/// policies. Transient transport failures are retried; a failed resolution
/// is never cached, so the caller may invoke this again.
pub(crate) async fn resolve_metadata(
    transport: &Arc<dyn StorageTransport>,
    handle: &ObjectHandle,
    options: &ReadOptions,
    stats: &dyn ChannelStats,
) -> Result<ObjectMetadata> {
    let metadata = run_with_backoff(&options.backoff, stats, "metadata fetch", || {
        let transport = Arc::clone(transport);
        let handle = handle.clone();
        async move { transport.fetch_metadata(&handle).await }
    })
    .await?;

    if metadata.is_gzip_encoded() && !options.support_gzip_encoding {
        return Err(ReadError::GzipUnsupported);
    }
    if let Some(requested) = handle.generation() {
        if requested != metadata.generation {
            return Err(ReadError::GenerationMismatch {
                requested,
                actual: metadata.generation,
            });
        }
    }
    Ok(metadata)
}
