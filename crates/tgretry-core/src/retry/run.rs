//! Retry loop: run an async operation until success or the policy says stop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::control::CancelToken;

use super::classify::ErrorClassifier;
use super::error::{ClassifiedError, RawFailure, RetryError};
use super::observer::{NoopObserver, RetryObserver};
use super::policy::{AttemptState, RetryAction, RetryPolicy};

/// What the operation is told about the attempt it is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptContext {
    pub attempt_number: u32,
    /// New chat id to use instead of the original one, after a migration.
    pub migrated_chat_id: Option<i64>,
}

/// Drives one operation through classify -> decide -> wait cycles.
///
/// The scheduler holds no per-sequence state: each `execute` call owns its
/// own `AttemptState`, so one scheduler can serve many concurrent callers.
#[derive(Clone)]
pub struct RetryScheduler<'c> {
    classifier: ErrorClassifier<'c>,
    policy: RetryPolicy,
    observer: Arc<dyn RetryObserver>,
}

impl Default for RetryScheduler<'static> {
    fn default() -> Self {
        Self::new(ErrorClassifier::default(), RetryPolicy::default())
    }
}

impl<'c> RetryScheduler<'c> {
    pub fn new(classifier: ErrorClassifier<'c>, policy: RetryPolicy) -> Self {
        Self {
            classifier,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn classifier(&self) -> &ErrorClassifier<'c> {
        &self.classifier
    }

    /// Run `operation` until it succeeds or the sequence gives up.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T, RetryError>
    where
        F: FnMut(AttemptContext) -> Fut,
        Fut: Future<Output = Result<T, RawFailure>>,
    {
        self.run(operation, None).await
    }

    /// Like [`execute`](Self::execute), stopping early when `cancel` fires.
    pub async fn execute_with_cancel<T, F, Fut>(
        &self,
        operation: F,
        cancel: &CancelToken,
    ) -> Result<T, RetryError>
    where
        F: FnMut(AttemptContext) -> Fut,
        Fut: Future<Output = Result<T, RawFailure>>,
    {
        self.run(operation, Some(cancel)).await
    }

    async fn run<T, F, Fut>(
        &self,
        mut operation: F,
        cancel: Option<&CancelToken>,
    ) -> Result<T, RetryError>
    where
        F: FnMut(AttemptContext) -> Fut,
        Fut: Future<Output = Result<T, RawFailure>>,
    {
        let mut state = AttemptState::new();
        // A budget too large to represent as an instant imposes no deadline.
        let deadline = self.policy.max_elapsed.and_then(|budget| {
            state
                .first_attempt_at
                .checked_add(budget)
                .map(|at| (budget, at))
        });

        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(RetryError::Cancelled {
                    last_error: state.last_error,
                });
            }

            let ctx = AttemptContext {
                attempt_number: state.attempt_number,
                migrated_chat_id: state.migrated_chat_id,
            };
            let attempt = operation(ctx);
            let outcome = match deadline {
                Some((budget, at)) => match tokio::time::timeout_at(at, attempt).await {
                    Ok(outcome) => outcome,
                    Err(_) => return Err(deadline_exceeded(budget, state)),
                },
                None => attempt.await,
            };

            let raw = match outcome {
                Ok(value) => {
                    if state.attempt_number > 1 || state.migrated_chat_id.is_some() {
                        tracing::debug!(
                            "operation succeeded on attempt {} after {:?}",
                            state.attempt_number,
                            state.elapsed()
                        );
                    }
                    return Ok(value);
                }
                Err(raw) => raw,
            };

            let classified = self.classifier.classify_failure(&raw);
            let decision = self.policy.decide(&classified, &state);
            self.observer
                .on_attempt_failed(&state, &classified, &decision);

            match decision.action {
                RetryAction::GiveUp => {
                    tracing::warn!(
                        "giving up after attempt {}: {}",
                        state.attempt_number,
                        classified
                    );
                    self.observer.on_give_up(&state, &classified);
                    return Err(RetryError::GaveUp(classified));
                }
                RetryAction::Retry => {
                    tracing::info!(
                        "chat migrated to {:?}; retrying with the new id",
                        classified.migrate_to_chat_id
                    );
                    state.migrated_chat_id = classified.migrate_to_chat_id;
                    state.last_error = Some(classified);
                }
                RetryAction::Wait => {
                    let delay = decision.delay.unwrap_or_default();
                    tracing::debug!(
                        "attempt {} failed with {} ({}); retrying in {:?}",
                        state.attempt_number,
                        decision.reason,
                        classified.retry_class().as_str(),
                        delay
                    );
                    state.last_error = Some(classified);

                    if let Some((budget, at)) = deadline {
                        if Instant::now().checked_add(delay).map_or(true, |end| end > at) {
                            return Err(deadline_exceeded(budget, state));
                        }
                    }
                    if !wait(delay, cancel).await {
                        tracing::debug!("retry sequence cancelled while waiting");
                        return Err(RetryError::Cancelled {
                            last_error: state.last_error,
                        });
                    }
                    state.attempt_number += 1;
                }
            }
        }
    }
}

/// Sleep for `delay`; returns false if cancelled first.
async fn wait(delay: Duration, cancel: Option<&CancelToken>) -> bool {
    match cancel {
        None => {
            tokio::time::sleep(delay).await;
            true
        }
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(delay) => true,
                _ = token.cancelled() => false,
            }
        }
    }
}

fn deadline_exceeded(budget: Duration, state: AttemptState) -> RetryError {
    let elapsed = state.elapsed();
    tracing::warn!(
        "retry budget {:?} exhausted after {} attempt(s)",
        budget,
        state.attempt_number
    );
    RetryError::DeadlineExceeded {
        budget,
        elapsed,
        last_error: state.last_error,
    }
}

/// Convenience wrapper: classify-and-retry with the built-in catalog and
/// default policy.
pub async fn run_with_retry<T, F, Fut>(operation: F) -> Result<T, RetryError>
where
    F: FnMut(AttemptContext) -> Fut,
    Fut: Future<Output = Result<T, RawFailure>>,
{
    RetryScheduler::default().execute(operation).await
}

/// Give-up text for operators: the error plus the corrective action.
pub fn describe_give_up(error: &ClassifiedError) -> String {
    format!(
        "{} failed: {}. What to do: {}",
        error.code(),
        error.descriptor.description,
        error.remediation()
    )
}
