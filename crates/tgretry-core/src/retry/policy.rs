use std::time::Duration;

use rand::Rng;
use tokio::time::Instant;

use crate::catalog::{ErrorKey, RetryClass};

use super::error::ClassifiedError;

/// What the scheduler should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Run again immediately (migration to a new chat id).
    Retry,
    /// Run again after `delay`.
    Wait,
    /// Stop and surface the error.
    GiveUp,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    pub action: RetryAction,
    pub delay: Option<Duration>,
    pub reason: ErrorKey,
}

impl RetryDecision {
    pub fn retry(reason: ErrorKey) -> Self {
        Self {
            action: RetryAction::Retry,
            delay: None,
            reason,
        }
    }

    pub fn wait(delay: Duration, reason: ErrorKey) -> Self {
        Self {
            action: RetryAction::Wait,
            delay: Some(delay),
            reason,
        }
    }

    pub fn give_up(reason: ErrorKey) -> Self {
        Self {
            action: RetryAction::GiveUp,
            delay: None,
            reason,
        }
    }
}

/// Bookkeeping for one in-flight retry sequence.
#[derive(Debug, Clone)]
pub struct AttemptState {
    /// 1-based; migration retries do not advance it.
    pub attempt_number: u32,
    pub first_attempt_at: Instant,
    pub last_error: Option<ClassifiedError>,
    /// Set once a migration has been followed; only one is allowed.
    pub migrated_chat_id: Option<i64>,
}

impl AttemptState {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(first_attempt_at: Instant) -> Self {
        Self {
            attempt_number: 1,
            first_attempt_at,
            last_error: None,
            migrated_chat_id: None,
        }
    }

    /// State as it would be at the given attempt (used by tests and callers
    /// driving the policy by hand).
    pub fn at_attempt(attempt_number: u32) -> Self {
        Self {
            attempt_number: attempt_number.max(1),
            ..Self::new()
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.first_attempt_at.elapsed()
    }
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new()
    }
}

pub const DEFAULT_MAX_ELAPSED: Duration = Duration::from_secs(300);

/// Exponential backoff policy with caps, jitter and an upstream-hint floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first) for backoff retries.
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    /// Floor applied to upstream `retry_after` hints.
    pub min_hint_delay: Duration,
    /// Fraction of the backoff delay used as +/- jitter (0.2 = 20%).
    pub jitter_ratio: f64,
    /// Overall wall-clock budget for one sequence, 300s by default.
    ///
    /// Hint-driven waits are not counted against `max_attempts`, so with
    /// `None` a peer that keeps answering 429 with `retry_after` is retried
    /// forever.
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            min_hint_delay: Duration::from_secs(1),
            jitter_ratio: 0.2,
            max_elapsed: Some(DEFAULT_MAX_ELAPSED),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do about `classified`, given where the sequence is.
    pub fn decide(&self, classified: &ClassifiedError, state: &AttemptState) -> RetryDecision {
        self.decide_with_rng(classified, state, &mut rand::thread_rng())
    }

    /// Same as [`decide`](Self::decide) with an explicit jitter source.
    ///
    /// Rules, in order:
    /// 1. an unconsumed migration with a new chat id retries immediately;
    /// 2. `NonRetryable` / `Permanent` give up;
    /// 3. `RetryableAfterHint` with a hint waits at least the hint;
    /// 4. everything else backs off exponentially until `max_attempts`.
    pub fn decide_with_rng<R: Rng>(
        &self,
        classified: &ClassifiedError,
        state: &AttemptState,
        rng: &mut R,
    ) -> RetryDecision {
        let reason = classified.key.clone();

        if classified.migrate_to_chat_id.is_some() && state.migrated_chat_id.is_none() {
            return RetryDecision::retry(reason);
        }

        let decision = match classified.retry_class() {
            RetryClass::NonRetryable | RetryClass::Permanent => RetryDecision::give_up(reason),
            RetryClass::RetryableAfterHint => match classified.retry_after() {
                Some(hint) => RetryDecision::wait(hint.max(self.min_hint_delay), reason),
                None => self.backoff(state.attempt_number, reason, rng),
            },
            RetryClass::RetryableWithBackoff => self.backoff(state.attempt_number, reason, rng),
        };

        // An upstream hint is never shortened, whatever the class.
        match (decision.delay, classified.retry_after()) {
            (Some(delay), Some(hint)) if hint > delay => RetryDecision::wait(hint, decision.reason),
            _ => decision,
        }
    }

    fn backoff<R: Rng>(&self, attempt: u32, reason: ErrorKey, rng: &mut R) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::give_up(reason);
        }
        let nominal = self.backoff_delay(attempt);
        let ratio = self.jitter_ratio();
        let delay = if ratio > 0.0 {
            let factor = 1.0 + rng.gen_range(-ratio..=ratio);
            scale(nominal, factor).min(self.max_delay)
        } else {
            nominal
        };
        RetryDecision::wait(delay, reason)
    }

    /// Un-jittered backoff delay: `base * 2^(attempt-1)`, capped at `max_delay`.
    ///
    /// `attempt` is 1-based (1 = first attempt).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let raw = self.base_delay.saturating_mul(1u32 << exp);
        raw.min(self.max_delay)
    }

    /// Lowest and highest delay a backoff wait at `attempt` can produce.
    pub fn backoff_bounds(&self, attempt: u32) -> (Duration, Duration) {
        let nominal = self.backoff_delay(attempt);
        let ratio = self.jitter_ratio();
        let low = scale(nominal, 1.0 - ratio).min(self.max_delay);
        let high = scale(nominal, 1.0 + ratio).min(self.max_delay);
        (low, high)
    }

    fn jitter_ratio(&self) -> f64 {
        if self.jitter_ratio.is_finite() {
            self.jitter_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// `delay * factor`, saturating at `Duration::MAX`.
fn scale(delay: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}
