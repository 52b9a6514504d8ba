//! Retry and backoff policy.
//!
//! This module turns raw upstream failures into catalog-backed
//! [`ClassifiedError`]s, decides per failure whether to retry, wait or give
//! up, and runs operations under that policy. The catalog is the only shared
//! state and it is read-only, so sequences run concurrently without locking.

mod classify;
mod error;
mod observer;
mod policy;
pub mod response;
mod run;

pub use classify::ErrorClassifier;
pub use error::{ClassifiedError, RawFailure, RetryError};
pub use observer::{NoopObserver, RetryObserver};
pub use policy::{AttemptState, RetryAction, RetryDecision, RetryPolicy, DEFAULT_MAX_ELAPSED};
pub use response::{raw_failure_from_response, ApiErrorBody};
pub use run::{describe_give_up, run_with_retry, AttemptContext, RetryScheduler};
