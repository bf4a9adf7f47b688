//! Optional observation sink for channel activity.
//!
//! The channel reports byte counts, seeks, stream opens and retries through
//! this trait so a surrounding filesystem layer can aggregate them. Nothing
//! is wired in by default.

/// Receives counters from a read channel. All methods default to no-ops so
/// implementors only override what they track.
pub trait ChannelStats: Send + Sync {
    fn record_bytes_read(&self, _count: u64) {}
    fn record_seek(&self) {}
    fn record_stream_open(&self) {}
    fn record_footer_prefetch(&self) {}
    fn record_retry(&self) {}
    fn record_error(&self) {}
}

/// Discards every observation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStats;

impl ChannelStats for NoopStats {}
