//! Optional hook for observing intermediate attempt failures.

use super::error::ClassifiedError;
use super::policy::{AttemptState, RetryDecision};

/// Telemetry hook. Intermediate failures are not returned to the caller of
/// `execute`; implement this to see them.
pub trait RetryObserver: Send + Sync {
    /// Called after every failed attempt, with the decision taken for it.
    fn on_attempt_failed(
        &self,
        _state: &AttemptState,
        _error: &ClassifiedError,
        _decision: &RetryDecision,
    ) {
    }

    /// Called once when the sequence gives up on a classified error.
    fn on_give_up(&self, _state: &AttemptState, _error: &ClassifiedError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RetryObserver for NoopObserver {}
