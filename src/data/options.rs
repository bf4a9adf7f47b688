use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ReadError, Result};
use crate::stats::ChannelStats;

/// Advisory hint about the expected access pattern of a channel.
///
/// The hint selects the range-request strategy:
///
/// - `Sequential` sends unbounded range requests and drains one stream.
/// - `Random` sends bounded range requests sized from the read buffer.
/// - `Auto` starts out sequential and permanently switches to random access
///   when a backward seek or a forward seek past the in-place limit is seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fadvise {
    #[default]
    Sequential,
    Random,
    Auto,
}

/// Parameters of the truncated exponential backoff applied to transient
/// failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffOptions {
    /// Delay before the first retry; later intervals grow from it.
    ///
    /// Default: 200ms
    pub initial_interval: Duration,

    /// Growth factor between consecutive intervals.
    ///
    /// Default: 1.5
    pub multiplier: f64,

    /// Jitter applied to each interval, as a fraction of the interval. A
    /// factor of 0.5 spreads sleeps over `[0.5x, 1.5x]` so that many clients
    /// retrying at once do not retry in lockstep.
    ///
    /// Default: 0.5
    pub randomization_factor: f64,

    /// Ceiling on a single interval; growth stops here.
    ///
    /// Default: 10s
    pub max_interval: Duration,

    /// Total sleep budget of one retry loop. Once it would be exceeded the
    /// sequencer gives up and the last transient error is surfaced.
    ///
    /// Default: 120s
    pub max_elapsed: Duration,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(200),
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval: Duration::from_secs(10),
            max_elapsed: Duration::from_secs(120),
        }
    }
}

impl BackoffOptions {
    #[must_use]
    pub fn initial_interval(mut self, initial_interval: Duration) -> Self {
        self.initial_interval = initial_interval;
        self
    }

    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    #[must_use]
    pub fn randomization_factor(mut self, randomization_factor: f64) -> Self {
        self.randomization_factor = randomization_factor;
        self
    }

    #[must_use]
    pub fn max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = max_interval;
        self
    }

    #[must_use]
    pub fn max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.multiplier >= 1.0) {
            return Err(ReadError::InvalidArgument(format!(
                "backoff multiplier must be at least 1, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(ReadError::InvalidArgument(format!(
                "backoff randomization factor must be within [0, 1], got {}",
                self.randomization_factor
            )));
        }
        Ok(())
    }
}

/// Connection and read timeouts of a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            read: Duration::from_secs(300),
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn connect(mut self, connect: Duration) -> Self {
        self.connect = connect;
        self
    }

    #[must_use]
    pub fn read(mut self, read: Duration) -> Self {
        self.read = read;
        self
    }
}

/// Configuration of a read channel.
///
/// # Examples
///
/// ```
/// use blobseek::{Fadvise, ReadOptions};
///
/// let options = ReadOptions::default()
///     .fadvise(Fadvise::Auto)
///     .min_range_request_size(4 * 1024 * 1024)
///     .fast_fail_on_not_found(false);
/// ```
#[derive(Clone)]
pub struct ReadOptions {
    /// Retry schedule for transient failures.
    pub backoff: BackoffOptions,

    /// When true, metadata is resolved at channel construction so opening a
    /// missing object fails immediately. When false, resolution is deferred
    /// to the first size-dependent operation.
    ///
    /// Default: true
    pub fast_fail_on_not_found: bool,

    /// When false, opening an object with gzip content encoding fails. When
    /// true, such objects can be read, but only sequentially and with an
    /// unknown size until the stream is drained.
    ///
    /// Default: false
    pub support_gzip_encoding: bool,

    /// Forward seeks within this many bytes of the current position are
    /// served by draining the live stream instead of opening a new one.
    ///
    /// Default: 8 MiB
    pub inplace_seek_limit: u64,

    /// Initial access-pattern hint.
    ///
    /// Default: [`Fadvise::Sequential`]
    pub fadvise: Fadvise,

    /// Lower bound on the span of a bounded range request, and the size of
    /// the prefetched footer region.
    ///
    /// Default: 2 MiB
    pub min_range_request_size: u64,

    /// Observation sink for counters. None disables reporting.
    ///
    /// Default: None
    pub stats: Option<Arc<dyn ChannelStats>>,
}

impl fmt::Debug for ReadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("backoff", &self.backoff)
            .field("fast_fail_on_not_found", &self.fast_fail_on_not_found)
            .field("support_gzip_encoding", &self.support_gzip_encoding)
            .field("inplace_seek_limit", &self.inplace_seek_limit)
            .field("fadvise", &self.fadvise)
            .field("min_range_request_size", &self.min_range_request_size)
            .field("stats", &self.stats.as_ref().map(|_| "{ ... }"))
            .finish()
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffOptions::default(),
            fast_fail_on_not_found: true,
            support_gzip_encoding: false,
            inplace_seek_limit: 8 * 1024 * 1024,
            fadvise: Fadvise::Sequential,
            min_range_request_size: 2 * 1024 * 1024,
            stats: None,
        }
    }
}

impl ReadOptions {
    #[must_use]
    pub fn backoff(mut self, backoff: BackoffOptions) -> Self {
        self.backoff = backoff;
        self
    }

    #[must_use]
    pub fn fast_fail_on_not_found(mut self, fast_fail_on_not_found: bool) -> Self {
        self.fast_fail_on_not_found = fast_fail_on_not_found;
        self
    }

    #[must_use]
    pub fn support_gzip_encoding(mut self, support_gzip_encoding: bool) -> Self {
        self.support_gzip_encoding = support_gzip_encoding;
        self
    }

    #[must_use]
    pub fn inplace_seek_limit(mut self, inplace_seek_limit: u64) -> Self {
        self.inplace_seek_limit = inplace_seek_limit;
        self
    }

    #[must_use]
    pub fn fadvise(mut self, fadvise: Fadvise) -> Self {
        self.fadvise = fadvise;
        self
    }

    #[must_use]
    pub fn min_range_request_size(mut self, min_range_request_size: u64) -> Self {
        self.min_range_request_size = min_range_request_size;
        self
    }

    /// Set the observation sink invoked for every read, seek and retry.
    #[must_use]
    pub fn stats(mut self, stats: Arc<dyn ChannelStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.backoff.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let options = ReadOptions::default();
        assert!(options.fast_fail_on_not_found);
        assert!(!options.support_gzip_encoding);
        assert_eq!(options.inplace_seek_limit, 8 * 1024 * 1024);
        assert_eq!(options.fadvise, Fadvise::Sequential);
        assert_eq!(options.min_range_request_size, 2 * 1024 * 1024);

        let backoff = options.backoff;
        assert_eq!(backoff.initial_interval, Duration::from_millis(200));
        assert_eq!(backoff.multiplier, 1.5);
        assert_eq!(backoff.randomization_factor, 0.5);
        assert_eq!(backoff.max_interval, Duration::from_secs(10));
        assert_eq!(backoff.max_elapsed, Duration::from_secs(120));
    }

    #[test]
    fn test_validation_rejects_bad_backoff_parameters() {
        let shrinking = ReadOptions::default().backoff(BackoffOptions::default().multiplier(0.5));
        assert!(matches!(
            shrinking.validate(),
            Err(ReadError::InvalidArgument(_))
        ));

        let wild_jitter =
            ReadOptions::default().backoff(BackoffOptions::default().randomization_factor(1.5));
        assert!(matches!(
            wild_jitter.validate(),
            Err(ReadError::InvalidArgument(_))
        ));

        assert!(ReadOptions::default().validate().is_ok());
    }
}
