//! Delay policy for failed and empty pages.

use std::time::Duration;

use mandi_sync_ingest_models::RunConfig;
use rand::Rng as _;

/// Exponential backoff shared by every retryable failure class.
///
/// Each failure yields the current base delay (jittered) and doubles the
/// base up to the ceiling; a successful page resets it to the floor.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter_ratio: f64,
    current: Duration,
}

impl Backoff {
    /// Creates a backoff starting at `initial` and capped at `max`.
    #[must_use]
    pub const fn new(initial: Duration, max: Duration, jitter_ratio: f64) -> Self {
        Self {
            initial,
            max,
            jitter_ratio,
            current: initial,
        }
    }

    /// Creates a backoff from the run configuration.
    #[must_use]
    pub const fn from_config(config: &RunConfig) -> Self {
        Self::new(config.initial_backoff, config.max_backoff, config.jitter_ratio)
    }

    /// Returns the base delay the next failure will use.
    #[must_use]
    pub fn current(&self) -> Duration {
        self.current.min(self.max)
    }

    /// Returns the delay for this failure and advances the base.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current();
        self.current = self.current.saturating_mul(2).min(self.max);
        jitter(base, self.jitter_ratio)
    }

    /// Returns the base to its floor.
    pub const fn reset(&mut self) {
        self.current = self.initial;
    }

    /// Delay before re-requesting after the `attempt`-th empty page in a
    /// row: grows linearly with `attempt` up to the ceiling.
    #[must_use]
    pub fn empty_page_delay(&self, attempt: u32) -> Duration {
        jitter(
            self.initial.saturating_mul(attempt).min(self.max),
            self.jitter_ratio,
        )
    }
}

/// Spreads `delay` uniformly over `±ratio × delay`, never below zero.
#[must_use]
pub fn jitter(delay: Duration, ratio: f64) -> Duration {
    if delay.is_zero() || ratio <= 0.0 {
        return delay;
    }

    let secs = delay.as_secs_f64();
    let delta = secs * ratio;
    let offset = rand::thread_rng().gen_range(-delta..=delta);
    Duration::from_secs_f64((secs + offset).max(0.0))
}
