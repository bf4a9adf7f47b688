use std::time::Duration;

use rand::{thread_rng, Rng};

use crate::data::BackoffOptions;

/// Produces the sleep intervals of one retry loop.
///
/// Intervals follow truncated exponential growth with uniform jitter: the
/// k-th nominal interval is `initial * multiplier^k` capped at the configured
/// maximum, perturbed into `[interval * (1 - f), interval * (1 + f)]`. The
/// sequencer tracks the total sleep it has handed out and signals give-up
/// once the next interval would push past the elapsed-time ceiling.
///
/// A sequencer belongs to a single retry loop; construct a fresh one per
/// operation.
#[derive(Debug)]
pub struct BackoffSequencer {
    options: BackoffOptions,
    next_interval: Duration,
    elapsed: Duration,
}

impl BackoffSequencer {
    pub fn new(options: BackoffOptions) -> Self {
        Self {
            next_interval: options.initial_interval,
            elapsed: Duration::ZERO,
            options,
        }
    }

    /// The next delay to sleep before retrying, or None once the elapsed
    /// budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = jittered(self.next_interval, self.options.randomization_factor);
        if self.elapsed + delay > self.options.max_elapsed {
            return None;
        }
        self.elapsed += delay;
        self.next_interval = self
            .next_interval
            .mul_f64(self.options.multiplier)
            .min(self.options.max_interval);
        Some(delay)
    }
}

fn jittered(interval: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || interval.is_zero() {
        return interval;
    }
    let scale = thread_rng().gen_range((1.0 - factor)..=(1.0 + factor));
    interval.mul_f64(scale)
}
