use std::future::Future;

use crate::core::BackoffSequencer;
use crate::data::BackoffOptions;
use crate::error::Result;
use crate::stats::ChannelStats;

/// Run `op` until it succeeds, fails terminally, or the backoff budget is
/// spent. Only transient errors are retried; the last one is surfaced when
/// the sequencer gives up.
pub async fn run_with_backoff<T, F, Fut>(
    backoff: &BackoffOptions,
    stats: &dyn ChannelStats,
    what: &str,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut sequencer = BackoffSequencer::new(*backoff);
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() => match sequencer.next_delay() {
                Some(delay) => {
                    stats.record_retry();
                    tracing::warn!(%error, ?delay, "{what} failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!(%error, "{what} failed, retry budget exhausted");
                    return Err(error);
                }
            },
            Err(error) => return Err(error),
        }
    }
}
